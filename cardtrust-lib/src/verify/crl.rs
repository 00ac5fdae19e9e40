//! Certificate Revocation Lists.
//!
//! Provides [`RevocationList`], an owned CRL with its revoked serials indexed
//! for constant-time lookup.

use crate::certificate::Certificate;
use crate::principal::Principal;
use crate::util;
use crate::CardTrustError;
use std::collections::HashSet;
use x509_parser::prelude::*;

/// A parsed, immutable CRL.
#[derive(Clone)]
pub struct RevocationList {
    der: Vec<u8>,
    issuer: Principal,
    this_update: i64,
    next_update: Option<i64>,
    crl_number: Option<String>,
    revoked_serials: HashSet<Vec<u8>>,
}

impl RevocationList {
    /// Parse a CRL from PEM or DER (auto-detected).
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

    /// Parse the first `X509 CRL` block of a PEM document.
    pub fn from_pem(input: &[u8]) -> Result<Self, CardTrustError> {
        for pem_result in Pem::iter_from_buffer(input) {
            let pem = pem_result
                .map_err(|e| CardTrustError::PemError(format!("failed to parse CRL PEM: {}", e)))?;
            if pem.label == "X509 CRL" {
                return Self::from_der(&pem.contents);
            }
        }
        Err(CardTrustError::PemError("no CRLs found in PEM input".into()))
    }

    /// Parse a DER-encoded CRL. Trailing bytes are ignored.
    pub fn from_der(input: &[u8]) -> Result<Self, CardTrustError> {
        let (remaining, crl) =
            x509_parser::revocation_list::CertificateRevocationList::from_der(input)
                .map_err(|e| CardTrustError::DerError(format!("{}", e)))?;
        let crl_len = input.len() - remaining.len();
        let der = input.get(..crl_len).unwrap_or(input).to_vec();

        let revoked_serials = crl
            .iter_revoked_certificates()
            .map(|revoked| util::serial_value(revoked.raw_serial()).to_vec())
            .collect();

        Ok(RevocationList {
            issuer: Principal::from_name(crl.issuer()),
            this_update: crl.last_update().timestamp(),
            next_update: crl.next_update().map(|t| t.timestamp()),
            crl_number: crl.crl_number().map(|n| format!("{:X}", n)),
            revoked_serials,
            der,
        })
    }

    /// Verify the CRL signature with `issuer`'s public key.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<(), CardTrustError> {
        let (_, crl) = x509_parser::revocation_list::CertificateRevocationList::from_der(&self.der)
            .map_err(|e| CardTrustError::DerError(format!("{}", e)))?;
        let issuer_x509 = issuer.parsed()?;
        crl.verify_signature(issuer_x509.public_key())
            .map_err(|e| CardTrustError::SignatureError(format!("{}", e)))
    }

    /// Whether the certificate's serial number is listed. Serials compare as
    /// integers, so a leading zero octet in either encoding is ignored.
    pub fn is_revoked(&self, cert: &Certificate) -> bool {
        self.revoked_serials
            .contains(util::serial_value(cert.raw_serial()))
    }

    /// A CRL is fresh until its next-update time has passed. A CRL without a
    /// next-update time is never fresh.
    pub fn is_fresh_at(&self, now_ts: i64) -> bool {
        self.next_update.is_some_and(|next| now_ts <= next)
    }

    pub fn issuer(&self) -> &Principal {
        &self.issuer
    }

    /// thisUpdate as Unix seconds.
    pub fn this_update(&self) -> i64 {
        self.this_update
    }

    /// nextUpdate as Unix seconds, when present.
    pub fn next_update(&self) -> Option<i64> {
        self.next_update
    }

    /// CRL Number extension as uppercase hex, when present.
    pub fn crl_number_hex(&self) -> Option<&str> {
        self.crl_number.as_deref()
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked_serials.len()
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl std::fmt::Debug for RevocationList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationList")
            .field("issuer", &self.issuer)
            .field("this_update", &util::format_iso8601(self.this_update))
            .field(
                "next_update",
                &self.next_update.map(util::format_iso8601),
            )
            .field("crl_number", &self.crl_number)
            .field("revoked", &self.revoked_serials.len())
            .finish()
    }
}
