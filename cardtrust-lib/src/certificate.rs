//! Owned X.509 certificates.

use crate::principal::Principal;
use crate::util;
use crate::CardTrustError;
use x509_parser::prelude::*;

/// PEM labels accepted for certificates.
const CERTIFICATE_LABELS: &[&str] = &["CERTIFICATE", "TRUSTED CERTIFICATE", "X509 CERTIFICATE"];

/// A parsed, immutable X.509 certificate.
///
/// Holds the DER encoding together with the attributes the trust engine
/// consults on every call. Signature checks re-parse the DER, which keeps the
/// type free of borrowed lifetimes so it can live in shared indexes.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: Principal,
    issuer: Principal,
    serial: Vec<u8>,
    not_before: i64,
    not_after: i64,
}

impl Certificate {
    /// Parse a certificate from PEM or DER (auto-detected).
    pub fn from_bytes(input: &[u8]) -> Result<Self, CardTrustError> {
        if input.is_empty() {
            return Err(CardTrustError::ParseError("empty input".into()));
        }
        if util::is_pem(input) {
            Self::from_pem(input)
        } else {
            Self::from_der(input)
        }
    }

    /// Parse the first certificate block of a PEM document.
    pub fn from_pem(input: &[u8]) -> Result<Self, CardTrustError> {
        for pem_result in Pem::iter_from_buffer(input) {
            let pem = pem_result.map_err(|e| CardTrustError::PemError(format!("{}", e)))?;
            if CERTIFICATE_LABELS.contains(&pem.label.as_str()) {
                return Self::from_der(&pem.contents);
            }
        }
        Err(CardTrustError::PemError(
            "no certificate found in PEM input".into(),
        ))
    }

    /// Parse a DER-encoded certificate. Trailing bytes are ignored.
    pub fn from_der(input: &[u8]) -> Result<Self, CardTrustError> {
        let (remaining, x509) = X509Certificate::from_der(input)
            .map_err(|e| CardTrustError::DerError(format!("{}", e)))?;
        let cert_len = input.len() - remaining.len();
        let der = input.get(..cert_len).unwrap_or(input).to_vec();

        let validity = x509.validity();
        Ok(Certificate {
            subject: Principal::from_name(x509.subject()),
            issuer: Principal::from_name(x509.issuer()),
            serial: x509.raw_serial().to_vec(),
            not_before: validity.not_before.timestamp(),
            not_after: validity.not_after.timestamp(),
            der,
        })
    }

    /// Re-parse the stored DER.
    pub(crate) fn parsed(&self) -> Result<X509Certificate<'_>, CardTrustError> {
        X509Certificate::from_der(&self.der)
            .map(|(_, x509)| x509)
            .map_err(|e| CardTrustError::DerError(format!("{}", e)))
    }

    /// Verify this certificate's signature with `issuer`'s public key.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<(), CardTrustError> {
        let child = self.parsed()?;
        let parent = issuer.parsed()?;
        child
            .verify_signature(Some(parent.public_key()))
            .map_err(|e| CardTrustError::SignatureError(format!("{}", e)))
    }

    /// Whether `now_ts` (Unix seconds) lies inside the validity interval.
    pub fn is_valid_at(&self, now_ts: i64) -> bool {
        self.not_before <= now_ts && now_ts <= self.not_after
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &Principal {
        &self.subject
    }

    pub fn issuer(&self) -> &Principal {
        &self.issuer
    }

    /// Raw serial number bytes as encoded in the certificate.
    pub fn raw_serial(&self) -> &[u8] {
        &self.serial
    }

    /// Serial number as uppercase hex without separators or leading zeros.
    pub fn serial_hex(&self) -> String {
        util::hex_upper_trimmed(&self.serial)
    }

    /// Not Before as Unix seconds.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// Not After as Unix seconds.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial_hex())
            .field("not_before", &util::format_iso8601(self.not_before))
            .field("not_after", &util::format_iso8601(self.not_after))
            .finish()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}
