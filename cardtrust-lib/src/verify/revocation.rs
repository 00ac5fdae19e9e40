//! Revocation checking against the intermediate CA's CRL.

use super::crl::RevocationList;
use super::crl_cache::CrlCache;
use crate::certificate::Certificate;
use crate::status::{CertificateStatusError, StatusCode};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of a revocation lookup whose CRL was found and authenticated.
#[derive(Debug, Clone)]
pub struct RevocationStatus {
    pub crl: Arc<RevocationList>,
    pub revoked: bool,
}

/// Verifies the CRL signature and looks up the certificate serial.
#[derive(Debug, Clone)]
pub struct RevocationChecker {
    cache: CrlCache,
}

impl RevocationChecker {
    pub fn new(cache: CrlCache) -> Self {
        RevocationChecker { cache }
    }

    pub fn cache(&self) -> &CrlCache {
        &self.cache
    }

    /// Fetch and authenticate the CRL for `cert`, then report whether the
    /// certificate is listed.
    ///
    /// Fails with [`StatusCode::CrlMissing`] when no CRL is available and
    /// with [`StatusCode::CrlSignatureInvalid`] when `ica` did not sign it.
    pub fn status(
        &self,
        ica: &Certificate,
        cert: &Certificate,
    ) -> Result<RevocationStatus, CertificateStatusError> {
        let crl = self.cache.get(cert.issuer())?;

        if let Err(e) = crl.verify_signed_by(ica) {
            error!(issuer = %crl.issuer(), error = %e, "CRL signature is not valid");
            return Err(CertificateStatusError::new(
                StatusCode::CrlSignatureInvalid,
                "CRL signature is not valid.",
            ));
        }

        let revoked = crl.is_revoked(cert);
        if revoked {
            warn!(serial = %cert.serial_hex(), issuer = %crl.issuer(), "Certificate is in CRL");
        } else {
            info!(serial = %cert.serial_hex(), issuer = %crl.issuer(), "Certificate not in CRL");
        }
        Ok(RevocationStatus { crl, revoked })
    }

    /// Like [`RevocationChecker::status`], but a listed certificate is an
    /// error ([`StatusCode::CertRevoked`]). Returns the CRL on success.
    pub fn verify_and_check(
        &self,
        ica: &Certificate,
        cert: &Certificate,
    ) -> Result<Arc<RevocationList>, CertificateStatusError> {
        let status = self.status(ica, cert)?;
        if status.revoked {
            return Err(revoked_error());
        }
        Ok(status.crl)
    }
}

pub(crate) fn revoked_error() -> CertificateStatusError {
    CertificateStatusError::new(StatusCode::CertRevoked, "Certificate is in CRL")
}
