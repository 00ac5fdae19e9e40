//! CRL discovery in a directory tree.

use super::clock::{Clock, SystemClock};
use super::crl::RevocationList;
use super::helpers::{read_file, regular_files};
use crate::principal::Principal;
use crate::util;
use crate::CardTrustError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces the CRL for an issuer on a cache miss.
///
/// `Ok(None)` means no usable CRL exists; errors are reserved for failures
/// of the source itself.
pub trait CrlLoader: Send + Sync {
    fn load(&self, issuer: &Principal) -> Result<Option<RevocationList>, CardTrustError>;
}

/// Finds CRL files for an issuer by walking a directory.
#[derive(Debug, Clone)]
pub struct CrlSource {
    dir: PathBuf,
    allow_stale: bool,
    clock: Arc<dyn Clock>,
}

impl CrlSource {
    /// `allow_stale` permits an outdated CRL when no up-to-date one exists.
    pub fn new(dir: impl Into<PathBuf>, allow_stale: bool) -> Self {
        Self::with_clock(dir, allow_stale, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, allow_stale: bool, clock: Arc<dyn Clock>) -> Self {
        CrlSource {
            dir: dir.into(),
            allow_stale,
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Find a usable CRL for `issuer` in the configured directory.
    pub fn find(&self, issuer: &Principal) -> Option<RevocationList> {
        find_crl(issuer, &self.dir, self.allow_stale, self.clock.now_ts())
    }
}

impl CrlLoader for CrlSource {
    fn load(&self, issuer: &Principal) -> Result<Option<RevocationList>, CardTrustError> {
        debug!(issuer = %issuer, "CRL not in cache or cache is expired, reloading");
        Ok(self.find(issuer))
    }
}

/// Walk `dir` for a CRL issued by `issuer`.
///
/// Files are visited in file-name order. The first CRL that is still fresh
/// at `now_ts` is returned immediately. Outdated CRLs are only remembered
/// when `allow_stale` is set, in which case the last one seen is returned if
/// the walk finds nothing fresh. CRLs without a next-update time are skipped.
pub fn find_crl(
    issuer: &Principal,
    dir: &Path,
    allow_stale: bool,
    now_ts: i64,
) -> Option<RevocationList> {
    let mut fallback = None;

    for path in regular_files(dir) {
        let Some(data) = read_file(&path) else {
            continue;
        };
        let crl = match RevocationList::from_bytes(&data) {
            Ok(crl) => crl,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Reading CRL from filesystem failed");
                continue;
            }
        };
        if crl.issuer() != issuer {
            continue;
        }

        let Some(next_update) = crl.next_update() else {
            warn!(path = %path.display(), issuer = %issuer, "CRL has no next update time, skipping");
            continue;
        };

        if crl.is_fresh_at(now_ts) {
            debug!(path = %path.display(), issuer = %issuer, "Found up-to-date CRL");
            return Some(crl);
        }

        warn!(
            path = %path.display(),
            next_update = %util::format_iso8601(next_update),
            "Found outdated CRL"
        );
        if allow_stale {
            fallback = Some(crl);
        }
    }

    fallback
}
