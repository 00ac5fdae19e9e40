//! Client certificate extraction from a forwarded header value.
//!
//! TLS terminators forward the client certificate either as a PEM block
//! (often with line breaks folded into spaces) or as a bare base64 body
//! without armor. Both forms are accepted here.

use crate::certificate::Certificate;
use crate::status::{CertificateStatusError, StatusCode};
use base64::Engine;
use tracing::warn;

const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_FOOTER: &str = "-----END CERTIFICATE-----";

/// Decode the certificate carried in a header value.
///
/// Blank or undecodable input is reported as [`StatusCode::NoCertFound`].
pub fn certificate_from_header(value: &str) -> Result<Certificate, CertificateStatusError> {
    let no_cert = || {
        CertificateStatusError::new(
            StatusCode::NoCertFound,
            "No valid X.509 certificates found in request",
        )
    };

    let body = armored_body(value.trim());
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        warn!("Client certificate header is empty");
        return Err(no_cert());
    }

    let der = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| {
            warn!(error = %e, "Client certificate header is not valid base64");
            no_cert()
        })?;

    Certificate::from_der(&der).map_err(|e| {
        warn!(error = %e, "Getting client certificate from request header failed");
        no_cert()
    })
}

/// Strip PEM armor when present; otherwise return the input unchanged.
fn armored_body(value: &str) -> &str {
    let Some(start) = value.find(PEM_HEADER) else {
        return value;
    };
    let after_header = value.get(start + PEM_HEADER.len()..).unwrap_or_default();
    match after_header.find(PEM_FOOTER) {
        Some(end) => after_header.get(..end).unwrap_or_default(),
        None => after_header,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn armor_is_stripped() {
        assert_eq!(
            armored_body("-----BEGIN CERTIFICATE----- QUJD -----END CERTIFICATE-----"),
            " QUJD "
        );
        assert_eq!(armored_body("QUJD"), "QUJD");
        assert_eq!(armored_body("-----BEGIN CERTIFICATE-----QUJD"), "QUJD");
    }

    #[test]
    fn blank_header_is_no_cert_found() {
        let err = certificate_from_header("   ").unwrap_err();
        assert_eq!(err.code(), StatusCode::NoCertFound);
    }

    #[test]
    fn garbage_header_is_no_cert_found() {
        let err = certificate_from_header("not a certificate!").unwrap_err();
        assert_eq!(err.code(), StatusCode::NoCertFound);

        // valid base64, but not DER
        let err = certificate_from_header("QUJDRA==").unwrap_err();
        assert_eq!(err.code(), StatusCode::NoCertFound);
    }
}
