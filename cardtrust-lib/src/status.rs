//! Certificate status codes reported to the authentication front-end.

use serde::Serialize;

/// Closed set of reasons a certificate is rejected.
///
/// Each code has a stable numeric form ([`StatusCode::code`]) that is passed
/// on to the login front-end, so the numbers must not be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// No usable certificate was presented.
    NoCertFound,
    /// The certificate serial is listed in the issuer's CRL.
    CertRevoked,
    /// The current time is outside the certificate validity interval.
    CertExpired,
    /// The root CA is unknown or did not sign the intermediate CA.
    UnknownRootCa,
    /// The intermediate CA is unknown or did not sign the certificate.
    UnknownIntermediateCa,
    /// No usable CRL was found for the issuer.
    CrlMissing,
    /// The CRL signature does not verify against the intermediate CA.
    CrlSignatureInvalid,
}

impl StatusCode {
    /// Numeric wire code.
    pub fn code(self) -> &'static str {
        match self {
            StatusCode::NoCertFound => "2",
            StatusCode::CertRevoked => "3",
            StatusCode::CertExpired => "7",
            StatusCode::UnknownRootCa => "8",
            StatusCode::UnknownIntermediateCa => "9",
            StatusCode::CrlMissing => "11",
            StatusCode::CrlSignatureInvalid => "12",
        }
    }

    /// Symbolic name, e.g. `CERT_REVOKED`.
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::NoCertFound => "NO_CERT_FOUND",
            StatusCode::CertRevoked => "CERT_REVOKED",
            StatusCode::CertExpired => "CERT_EXPIRED",
            StatusCode::UnknownRootCa => "UNKNOWN_CA",
            StatusCode::UnknownIntermediateCa => "UNKNOWN_ICA",
            StatusCode::CrlMissing => "CRL_MISSING",
            StatusCode::CrlSignatureInvalid => "CRL_SIGNATURE_FAILED",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// A terminal validation failure: a [`StatusCode`] plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} [{code}]")]
pub struct CertificateStatusError {
    code: StatusCode,
    reason: String,
}

impl CertificateStatusError {
    pub fn new(code: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
