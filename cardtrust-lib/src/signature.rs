//! Detached data signatures made with the card's signing key.

use crate::certificate::Certificate;
use crate::oid;
use base64::Engine;
use ring::signature::{self, UnparsedPublicKey};
use tracing::{debug, warn};

/// Check a base64 `signature_b64` over the base64-decoded `data_b64` with the
/// public key of `cert`.
///
/// RSA keys are checked as PKCS#1 v1.5 with SHA-256 and EC keys as ECDSA
/// P-256 with SHA-256. Any decoding or verification failure yields `false`.
pub fn verify_data_signature(data_b64: &str, signature_b64: &str, cert: &Certificate) -> bool {
    debug!(subject = %cert.subject(), "Checking data signature");
    let engine = base64::engine::general_purpose::STANDARD;

    let data = match engine.decode(data_b64.trim()) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "Signed data is not valid base64");
            return false;
        }
    };
    let sig = match engine.decode(signature_b64.trim()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Signature is not valid base64");
            return false;
        }
    };
    let x509 = match cert.parsed() {
        Ok(x) => x,
        Err(e) => {
            warn!(error = %e, "Signer certificate could not be parsed");
            return false;
        }
    };

    let spki = x509.public_key();
    let algorithm: &'static dyn signature::VerificationAlgorithm =
        match spki.algorithm.algorithm.to_id_string().as_str() {
            oid::RSA_ENCRYPTION => &signature::RSA_PKCS1_2048_8192_SHA256,
            oid::EC_PUBLIC_KEY => &signature::ECDSA_P256_SHA256_ASN1,
            other => {
                warn!(algorithm = other, "Unsupported signer key algorithm");
                return false;
            }
        };

    let key = UnparsedPublicKey::new(algorithm, spki.subject_public_key.data.as_ref());
    match key.verify(&data, &sig) {
        Ok(()) => true,
        Err(_) => {
            warn!(subject = %cert.subject(), "Data signature does not verify");
            false
        }
    }
}
