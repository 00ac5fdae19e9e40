//! Card certificate verification.
//!
//! A check runs two stages and stops at the first failure:
//!
//! 1. [`ChainValidator`]: validity dates, then the leaf -> intermediate CA ->
//!    root CA signatures against the [`TrustAnchorIndex`].
//! 2. [`RevocationChecker`]: the intermediate's CRL, fetched through the
//!    [`CrlCache`] from a [`CrlSource`], must be signed by the intermediate
//!    and must not list the certificate.
//!
//! [`CertificateChecker`] composes both stages and produces an
//! [`AuditRecord`] whenever the CRL stage was reached with a usable CRL.

mod audit;
mod chain;
mod clock;
mod crl;
mod crl_cache;
mod crl_source;
mod helpers;
mod revocation;
mod trust_store;

pub use audit::{AuditRecord, AuditSink, TracingAuditSink};
pub use chain::ChainValidator;
pub use clock::{Clock, FixedClock, SystemClock};
pub use crl::RevocationList;
pub use crl_cache::{CrlCache, DEFAULT_CAPACITY};
pub use crl_source::{find_crl, CrlLoader, CrlSource};
pub use revocation::{RevocationChecker, RevocationStatus};
pub use trust_store::TrustAnchorIndex;

use crate::certificate::Certificate;
use crate::config::CheckerConfig;
use crate::status::{CertificateStatusError, StatusCode};
use crate::CardTrustError;
use std::sync::Arc;

/// Result of one certificate check together with its audit record.
#[derive(Debug, Clone)]
pub struct CheckOutcome<'c> {
    /// The validated certificate, or the reason it was rejected.
    pub result: Result<&'c Certificate, CertificateStatusError>,
    /// Present when a CRL was obtained and authenticated: on success and on
    /// [`StatusCode::CertRevoked`].
    pub audit: Option<AuditRecord>,
}

impl CheckOutcome<'_> {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        self.result.as_ref().err().map(|e| e.code())
    }
}

impl std::fmt::Display for CheckOutcome<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(cert) => write!(f, "{}, {}, OK", cert.subject(), cert.serial_hex()),
            Err(e) => write!(f, "FAIL, {}", e),
        }
    }
}

/// Validates card certificates: chain first, then revocation.
///
/// Cheap to clone; clones share the trust anchors and the CRL cache.
#[derive(Clone)]
pub struct CertificateChecker {
    chain: ChainValidator,
    revocation: RevocationChecker,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl std::fmt::Debug for CertificateChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateChecker")
            .field("chain", &self.chain)
            .field("revocation", &self.revocation)
            .field("audit_sink", &self.audit_sink.is_some())
            .finish()
    }
}

impl CertificateChecker {
    pub fn new(chain: ChainValidator, revocation: RevocationChecker) -> Self {
        CertificateChecker {
            chain,
            revocation,
            audit_sink: None,
        }
    }

    /// Load the trust anchors and set up the CRL cache described by `config`.
    ///
    /// Audit records go to a [`TracingAuditSink`].
    pub fn from_config(config: &CheckerConfig) -> Result<Self, CardTrustError> {
        config.validate()?;
        let anchors = Arc::new(TrustAnchorIndex::load(&config.ca_dir, &config.ica_dir));
        let source = CrlSource::new(config.crl_dir.clone(), config.allow_stale_crl);
        let cache = CrlCache::new(
            Arc::new(source),
            config.crl_cache_capacity,
            config.crl_cache_expiration(),
        );
        Ok(
            Self::new(ChainValidator::new(anchors), RevocationChecker::new(cache))
                .with_audit_sink(Arc::new(TracingAuditSink)),
        )
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn anchors(&self) -> &TrustAnchorIndex {
        self.chain.anchors()
    }

    pub fn crl_cache(&self) -> &CrlCache {
        self.revocation.cache()
    }

    /// Validate `cert`, returning it on success.
    pub fn check<'c>(&self, cert: &'c Certificate) -> Result<&'c Certificate, CertificateStatusError> {
        self.inspect(cert).result
    }

    /// Validate `cert` and return the outcome together with its audit record.
    ///
    /// The audit record, when produced, is also handed to the configured
    /// [`AuditSink`].
    pub fn inspect<'c>(&self, cert: &'c Certificate) -> CheckOutcome<'c> {
        let ica = match self.chain.validate(cert) {
            Ok(ica) => ica,
            Err(e) => {
                return CheckOutcome {
                    result: Err(e),
                    audit: None,
                }
            }
        };

        let (result, audit) = match self.revocation.status(ica, cert) {
            Ok(status) => {
                let audit = AuditRecord::new(cert, &status.crl, status.revoked);
                if status.revoked {
                    (Err(revocation::revoked_error()), Some(audit))
                } else {
                    (Ok(cert), Some(audit))
                }
            }
            Err(e) => (Err(e), None),
        };

        if let (Some(sink), Some(record)) = (&self.audit_sink, &audit) {
            sink.record(record);
        }
        CheckOutcome { result, audit }
    }
}
