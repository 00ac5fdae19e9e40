//! Two-hop chain validation: leaf -> intermediate CA -> root CA.
//!
//! The card PKI has a fixed depth, so no path building is done here: the
//! intermediate is looked up by the leaf's issuer name and the root by the
//! intermediate's issuer name.

use super::clock::{Clock, SystemClock};
use super::trust_store::TrustAnchorIndex;
use crate::certificate::Certificate;
use crate::status::{CertificateStatusError, StatusCode};
use crate::util;
use std::sync::Arc;
use tracing::{error, warn};

/// Checks validity dates and the two signatures of a card certificate chain.
#[derive(Debug, Clone)]
pub struct ChainValidator {
    anchors: Arc<TrustAnchorIndex>,
    clock: Arc<dyn Clock>,
}

impl ChainValidator {
    pub fn new(anchors: Arc<TrustAnchorIndex>) -> Self {
        Self::with_clock(anchors, Arc::new(SystemClock))
    }

    pub fn with_clock(anchors: Arc<TrustAnchorIndex>, clock: Arc<dyn Clock>) -> Self {
        ChainValidator { anchors, clock }
    }

    pub fn anchors(&self) -> &TrustAnchorIndex {
        &self.anchors
    }

    /// Validate `cert` and return the intermediate CA that signed it.
    ///
    /// Checks, in order, stopping at the first failure:
    /// 1. the current time is inside the validity interval ([`StatusCode::CertExpired`])
    /// 2. an intermediate CA with subject == cert issuer exists and signed
    ///    the certificate ([`StatusCode::UnknownIntermediateCa`])
    /// 3. a root CA with subject == intermediate issuer exists and signed
    ///    the intermediate ([`StatusCode::UnknownRootCa`])
    pub fn validate(&self, cert: &Certificate) -> Result<&Certificate, CertificateStatusError> {
        let now_ts = self.clock.now_ts();
        if !cert.is_valid_at(now_ts) {
            warn!(
                subject = %cert.subject(),
                not_before = %util::format_iso8601(cert.not_before()),
                not_after = %util::format_iso8601(cert.not_after()),
                "Card certificate is expired."
            );
            return Err(CertificateStatusError::new(
                StatusCode::CertExpired,
                "Card certificate is expired.",
            ));
        }

        let ica = self
            .anchors
            .lookup_ica(cert.issuer())
            .ok_or_else(|| {
                warn!(issuer = %cert.issuer(), "No intermediate CA found for certificate issuer");
                unknown_ica()
            })?;
        cert.verify_signed_by(ica).map_err(|e| {
            warn!(subject = %cert.subject(), error = %e, "Certificate signature is not valid.");
            unknown_ica()
        })?;

        let ca = self.anchors.lookup_ca(ica.issuer()).ok_or_else(|| {
            error!(issuer = %ica.issuer(), "No root CA found for intermediate CA issuer");
            unknown_ca()
        })?;
        ica.verify_signed_by(ca).map_err(|e| {
            error!(
                subject = %ica.subject(),
                error = %e,
                "Intermediate CA-certificate signature is not valid."
            );
            unknown_ca()
        })?;

        Ok(ica)
    }
}

fn unknown_ica() -> CertificateStatusError {
    CertificateStatusError::new(
        StatusCode::UnknownIntermediateCa,
        "Certificate signature is not valid.",
    )
}

fn unknown_ca() -> CertificateStatusError {
    CertificateStatusError::new(
        StatusCode::UnknownRootCa,
        "Intermediate CA-certificate signature is not valid.",
    )
}
