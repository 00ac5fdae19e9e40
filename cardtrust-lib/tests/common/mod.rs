//! Test PKI generated at run time with rcgen.
//!
//! Builds a root CA, an intermediate CA signed by it, leaf certificates and
//! CRLs, and lays them out in a temporary directory as
//! `ca/`, `ica/` and `crl/`.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use cardtrust_lib::{Certificate, CheckerConfig, Principal, RevocationList};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, DistinguishedName,
    DnType, DnValue, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose, PrintableString,
    RevocationReason, RevokedCertParams, SerialNumber,
};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};

pub const ROOT_CN: &str = "Test Root CA";
pub const ICA_CN: &str = "Test Citizen CA";

// ---------------------------------------------------------------------------
// Authorities
// ---------------------------------------------------------------------------

/// A CA certificate and its signing key.
pub struct Authority {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

fn name(cn: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, "FI");
    dn.push(DnType::OrganizationName, "Card Trust Test");
    dn.push(DnType::CommonName, cn);
    dn
}

/// Same attributes as [`name`], every value encoded as PrintableString
/// instead of UTF8String.
fn printable_name(cn: &str) -> DistinguishedName {
    let printable = |value: &str| DnValue::PrintableString(PrintableString::try_from(value).unwrap());
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, printable("FI"));
    dn.push(DnType::OrganizationName, printable("Card Trust Test"));
    dn.push(DnType::CommonName, printable(cn));
    dn
}

fn ca_params(cn: &str, serial: &[u8]) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name = name(cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params.serial_number = Some(SerialNumber::from_slice(serial));
    params.not_before = OffsetDateTime::now_utc() - Duration::days(365);
    params.not_after = OffsetDateTime::now_utc() + Duration::days(3650);
    params
}

impl Authority {
    /// Self-signed root CA.
    pub fn root(cn: &str) -> Self {
        let key = KeyPair::generate().unwrap();
        let cert = ca_params(cn, &[0x0a]).self_signed(&key).unwrap();
        Authority { cert, key }
    }

    /// Intermediate CA signed by `parent`.
    pub fn intermediate(cn: &str, parent: &Authority) -> Self {
        let key = KeyPair::generate().unwrap();
        let cert = ca_params(cn, &[0x0b])
            .signed_by(&key, &parent.cert, &parent.key)
            .unwrap();
        Authority { cert, key }
    }

    /// Re-issue this CA under `parent` with the same key, its subject name
    /// encoded as PrintableString.
    pub fn reissue_printable(&self, cn: &str, parent: &Authority) -> Self {
        let key = KeyPair::try_from(self.key.serialize_der().as_slice()).unwrap();
        let mut params = ca_params(cn, &[0x0c]);
        params.distinguished_name = printable_name(cn);
        let cert = params.signed_by(&key, &parent.cert, &parent.key).unwrap();
        Authority { cert, key }
    }

    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(&self.der()).unwrap()
    }

    pub fn subject(&self) -> Principal {
        self.certificate().subject().clone()
    }

    /// Issue an end-entity certificate valid over `[not_before, not_after]`.
    pub fn issue(
        &self,
        cn: &str,
        serial: &[u8],
        not_before: OffsetDateTime,
        not_after: OffsetDateTime,
    ) -> Certificate {
        self.issue_keyed(cn, serial, not_before, not_after).0
    }

    /// Like [`Authority::issue`], also returning the P-256 card key.
    pub fn issue_keyed(
        &self,
        cn: &str,
        serial: &[u8],
        not_before: OffsetDateTime,
        not_after: OffsetDateTime,
    ) -> (Certificate, KeyPair) {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name = name(cn);
        params.is_ca = IsCa::ExplicitNoCa;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.serial_number = Some(SerialNumber::from_slice(serial));
        params.not_before = not_before;
        params.not_after = not_after;
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        (Certificate::from_der(cert.der()).unwrap(), key)
    }

    /// Issue an end-entity certificate valid from yesterday for a year.
    pub fn issue_valid(&self, cn: &str, serial: &[u8]) -> Certificate {
        let now = OffsetDateTime::now_utc();
        self.issue(cn, serial, now - Duration::days(1), now + Duration::days(365))
    }

    /// Issue a CRL listing `revoked` serials, DER-encoded.
    pub fn crl(
        &self,
        revoked: &[&[u8]],
        this_update: OffsetDateTime,
        next_update: OffsetDateTime,
        crl_number: &[u8],
    ) -> Vec<u8> {
        let revoked_certs = revoked
            .iter()
            .map(|serial| RevokedCertParams {
                serial_number: SerialNumber::from_slice(serial),
                revocation_time: this_update - Duration::hours(1),
                reason_code: Some(RevocationReason::KeyCompromise),
                invalidity_date: None,
            })
            .collect();
        let params = CertificateRevocationListParams {
            this_update,
            next_update,
            crl_number: SerialNumber::from_slice(crl_number),
            issuing_distribution_point: None,
            revoked_certs,
            key_identifier_method: KeyIdMethod::Sha256,
        };
        params
            .signed_by(&self.cert, &self.key)
            .unwrap()
            .der()
            .to_vec()
    }

    /// CRL issued a day ago and valid for another week.
    pub fn fresh_crl(&self, revoked: &[&[u8]], crl_number: &[u8]) -> Vec<u8> {
        let now = OffsetDateTime::now_utc();
        self.crl(
            revoked,
            now - Duration::days(1),
            now + Duration::days(7),
            crl_number,
        )
    }

    /// CRL whose next update passed yesterday.
    pub fn stale_crl(&self, revoked: &[&[u8]], crl_number: &[u8]) -> Vec<u8> {
        let now = OffsetDateTime::now_utc();
        self.crl(
            revoked,
            now - Duration::days(10),
            now - Duration::days(1),
            crl_number,
        )
    }
}

impl Authority {
    /// Fresh CRL with the optional nextUpdate field removed and the TBS
    /// re-signed with this CA's P-256 key.
    pub fn crl_without_next_update(&self, revoked: &[&[u8]], crl_number: &[u8]) -> Vec<u8> {
        let der = self.fresh_crl(revoked, crl_number);
        let (_, outer, _, _) = split_tlv(&der);
        let (_, tbs, _, rest) = split_tlv(outer);
        let (_, _, algorithm, _) = split_tlv(rest);

        // thisUpdate is the first Time in the TBS, nextUpdate the second
        let mut fields = Vec::new();
        let mut times = 0;
        let mut input = tbs;
        while !input.is_empty() {
            let (tag, _, element, rest) = split_tlv(input);
            let is_time = tag == 0x17 || tag == 0x18;
            if is_time {
                times += 1;
            }
            if !(is_time && times == 2) {
                fields.extend_from_slice(element);
            }
            input = rest;
        }
        assert_eq!(times, 2, "CRL should carry both update times");
        let tbs = encode_tlv(0x30, &fields);

        let rng = SystemRandom::new();
        let signer =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.key.serialize_der(), &rng)
                .unwrap();
        let signature = signer.sign(&rng, &tbs).unwrap();
        let mut bits = vec![0x00];
        bits.extend_from_slice(signature.as_ref());

        let mut body = tbs;
        body.extend_from_slice(algorithm);
        body.extend(encode_tlv(0x03, &bits));
        encode_tlv(0x30, &body)
    }
}

/// Split one DER element off `input`: (tag, content, whole element, rest).
fn split_tlv(input: &[u8]) -> (u8, &[u8], &[u8], &[u8]) {
    let tag = input[0];
    let (len, header) = match input[1] {
        short if short < 0x80 => (short as usize, 2),
        long => {
            let n = (long & 0x7f) as usize;
            let len = input[2..2 + n]
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | *b as usize);
            (len, 2 + n)
        }
    };
    let end = header + len;
    (tag, &input[header..end], &input[..end], &input[end..])
}

fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let octets: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0x80 | octets.len() as u8);
        out.extend(octets);
    }
    out.extend_from_slice(content);
    out
}

pub fn parse_crl(der: &[u8]) -> RevocationList {
    RevocationList::from_der(der).unwrap()
}

// ---------------------------------------------------------------------------
// On-disk layout
// ---------------------------------------------------------------------------

/// Root + intermediate written to `ca/` and `ica/`, with an empty `crl/`.
pub struct Pki {
    pub dir: TempDir,
    pub root: Authority,
    pub ica: Authority,
}

impl Pki {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Authority::root(ROOT_CN);
        let ica = Authority::intermediate(ICA_CN, &root);
        for sub in ["ca", "ica", "crl"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        let pki = Pki { dir, root, ica };
        pki.write("ca/root.crt", pki.root.pem().as_bytes());
        pki.write("ica/citizen.der", &pki.ica.der());
        pki
    }

    pub fn ca_dir(&self) -> PathBuf {
        self.dir.path().join("ca")
    }

    pub fn ica_dir(&self) -> PathBuf {
        self.dir.path().join("ica")
    }

    pub fn crl_dir(&self) -> PathBuf {
        self.dir.path().join("crl")
    }

    /// Write `data` at `relative` under the temporary root, creating parents.
    pub fn write(&self, relative: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, data).unwrap();
        path
    }

    pub fn config(&self) -> CheckerConfig {
        CheckerConfig {
            ca_dir: self.ca_dir(),
            ica_dir: self.ica_dir(),
            crl_dir: self.crl_dir(),
            crl_cache_capacity: 1000,
            crl_cache_expiration_ms: 60_000,
            allow_stale_crl: false,
        }
    }
}

/// An empty directory that outlives the call.
pub fn empty_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

pub fn missing_dir(base: &Path) -> PathBuf {
    base.join("does-not-exist")
}
