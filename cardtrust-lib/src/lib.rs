//! cardtrust-lib: trust engine for smart-card client certificates.
//!
//! Validates an end-user certificate against a fixed two-level PKI
//! (leaf -> intermediate CA -> root CA) loaded from directories on disk, then
//! checks it against the intermediate's certificate revocation list, which is
//! discovered in a CRL directory and held in a bounded, time-expiring cache.
//!
//! The entry point is [`CertificateChecker`]; it is usually built from a
//! [`CheckerConfig`] with [`CertificateChecker::from_config`].

mod certificate;
mod config;
mod header;
mod oid;
mod principal;
mod signature;
mod status;
mod util;
pub mod verify;

pub use certificate::Certificate;
pub use config::CheckerConfig;
pub use header::certificate_from_header;
pub use principal::Principal;
pub use signature::verify_data_signature;
pub use status::{CertificateStatusError, StatusCode};
pub use verify::{
    AuditRecord, AuditSink, CertificateChecker, ChainValidator, CheckOutcome, Clock, CrlCache,
    CrlLoader, CrlSource, FixedClock, RevocationChecker, RevocationList, SystemClock,
    TracingAuditSink, TrustAnchorIndex,
};

/// Infrastructure errors returned by cardtrust-lib.
///
/// These describe why a file, a configuration value or an encoded object
/// could not be used. Validation outcomes are reported separately through
/// [`CertificateStatusError`].
#[derive(Debug, thiserror::Error)]
pub enum CardTrustError {
    #[error("Failed to parse: {0}")]
    ParseError(String),

    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
