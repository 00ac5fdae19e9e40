//! Trust anchors for the two-level card PKI.
//!
//! Provides [`TrustAnchorIndex`], which maps subject names to root CA and
//! intermediate CA certificates loaded from two directories.

use super::helpers::{read_file, regular_files};
use crate::certificate::Certificate;
use crate::principal::Principal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Root and intermediate CA certificates keyed by their own subject name.
///
/// Built once and never mutated afterwards, so a shared reference can be
/// read from any number of threads.
pub struct TrustAnchorIndex {
    cas: HashMap<Principal, Certificate>,
    icas: HashMap<Principal, Certificate>,
}

impl std::fmt::Debug for TrustAnchorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchorIndex")
            .field("cas", &self.cas.len())
            .field("icas", &self.icas.len())
            .finish()
    }
}

impl TrustAnchorIndex {
    /// Load root CAs from `ca_dir` and intermediate CAs from `ica_dir`.
    ///
    /// Both directories are walked recursively. Files that cannot be read or
    /// parsed as a certificate are logged and skipped; a missing directory
    /// yields an empty map.
    pub fn load(ca_dir: &Path, ica_dir: &Path) -> Self {
        let cas = index_by_subject("CA", scan_certificates(ca_dir));
        let icas = index_by_subject("intermediate CA", scan_certificates(ica_dir));
        info!(
            ca_dir = %ca_dir.display(),
            ica_dir = %ica_dir.display(),
            cas = cas.len(),
            icas = icas.len(),
            "Loaded trust anchors"
        );
        TrustAnchorIndex { cas, icas }
    }

    /// Build an index from certificates already in memory.
    pub fn from_certificates(cas: Vec<Certificate>, icas: Vec<Certificate>) -> Self {
        let label = |certs: Vec<Certificate>| {
            certs
                .into_iter()
                .map(|c| (PathBuf::from("<memory>"), c))
                .collect::<Vec<_>>()
        };
        TrustAnchorIndex {
            cas: index_by_subject("CA", label(cas)),
            icas: index_by_subject("intermediate CA", label(icas)),
        }
    }

    /// Root CA whose subject equals `subject`.
    pub fn lookup_ca(&self, subject: &Principal) -> Option<&Certificate> {
        self.cas.get(subject)
    }

    /// Intermediate CA whose subject equals `subject`.
    pub fn lookup_ica(&self, subject: &Principal) -> Option<&Certificate> {
        self.icas.get(subject)
    }

    pub fn ca_count(&self) -> usize {
        self.cas.len()
    }

    pub fn ica_count(&self) -> usize {
        self.icas.len()
    }

    pub fn ca_subjects(&self) -> impl Iterator<Item = &Principal> {
        self.cas.keys()
    }

    pub fn ica_subjects(&self) -> impl Iterator<Item = &Principal> {
        self.icas.keys()
    }
}

/// Parse every regular file under `dir` as a certificate.
fn scan_certificates(dir: &Path) -> Vec<(PathBuf, Certificate)> {
    regular_files(dir)
        .into_iter()
        .filter_map(|path| {
            let data = read_file(&path)?;
            match Certificate::from_bytes(&data) {
                Ok(cert) => Some((path, cert)),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Reading certificate authority certificate from file system failed"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Key certificates by subject. The last certificate for a subject wins;
/// earlier ones are reported.
fn index_by_subject(
    kind: &str,
    entries: Vec<(PathBuf, Certificate)>,
) -> HashMap<Principal, Certificate> {
    let mut map: HashMap<Principal, Certificate> = HashMap::with_capacity(entries.len());
    for (path, cert) in entries {
        let subject = cert.subject().clone();
        if let Some(previous) = map.insert(subject, cert) {
            warn!(
                subject = %previous.subject(),
                path = %path.display(),
                "Duplicate {} subject, replacing previously loaded certificate", kind
            );
        }
    }
    map
}
