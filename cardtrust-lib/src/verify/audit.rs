//! Audit records for certificate checks that reached the CRL stage.

use super::crl::RevocationList;
use crate::certificate::Certificate;
use crate::util;
use crate::CardTrustError;
use serde::Serialize;
use tracing::{info, warn};

/// What was checked and against which CRL.
///
/// Produced only when both the certificate and its CRL were obtained, that
/// is for accepted certificates and for revoked ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Certificate serial number, uppercase hex.
    pub serial_number: String,
    /// CRL Number extension, uppercase hex (empty when absent).
    pub crl_number: String,
    /// Common name of the certificate issuer (empty when absent).
    pub issuer_cn: String,
    /// CRL thisUpdate as `YYYYMMDDTHHMMSSZ`.
    pub last_update: String,
    pub revoked: bool,
}

impl AuditRecord {
    pub fn new(cert: &Certificate, crl: &RevocationList, revoked: bool) -> Self {
        let crl_number = match crl.crl_number_hex() {
            Some(n) => n.to_string(),
            None => {
                warn!(issuer = %crl.issuer(), "CRL Number extension not present");
                String::new()
            }
        };
        AuditRecord {
            serial_number: cert.serial_hex(),
            crl_number,
            issuer_cn: cert.issuer().common_name().unwrap_or_default().to_string(),
            last_update: util::format_compact_utc(crl.this_update()),
            revoked,
        }
    }

    pub fn to_json(&self) -> Result<String, CardTrustError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "serial={} crl_number={} issuer_cn={} crl_last_update={} revoked={}",
            self.serial_number, self.crl_number, self.issuer_cn, self.last_update, self.revoked
        )
    }
}

/// Receives the audit record of every check that produced one.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Writes audit records as `tracing` events on the `cardtrust::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        info!(
            target: "cardtrust::audit",
            serial_number = %record.serial_number,
            crl_number = %record.crl_number,
            issuer_cn = %record.issuer_cn,
            last_update = %record.last_update,
            revoked = record.revoked,
            "certificate check"
        );
    }
}
