//! Distinguished-name identities used as index and cache keys.

use crate::oid;
use std::hash::{Hash, Hasher};
use x509_parser::der_parser::asn1_rs::Tag;
use x509_parser::prelude::*;

/// A subject or issuer identity.
///
/// Equality and hashing use a canonical form of the name: the RDN sequence
/// with each attribute value decoded from its string type, whitespace
/// collapsed and lowercased. A name encoded as UTF8String therefore equals
/// the same name encoded as PrintableString. The DER encoding, the one-line
/// rendering and the common name are kept for logging and audit.
#[derive(Clone)]
pub struct Principal {
    canonical: Vec<Vec<(String, String)>>,
    raw: Vec<u8>,
    display: String,
    common_name: Option<String>,
}

impl Principal {
    pub(crate) fn from_name(name: &X509Name) -> Self {
        let mut components = Vec::new();
        let mut canonical = Vec::new();
        let mut common_name = None;
        for rdn in name.iter() {
            let mut key = Vec::new();
            for attr in rdn.iter() {
                let attr_oid = attr.attr_type().to_id_string();
                let text = attr_text(attr);
                let value = text.clone().unwrap_or_else(|| "<binary>".to_string());
                if common_name.is_none() && attr_oid == oid::COMMON_NAME {
                    common_name = Some(value.clone());
                }
                components.push(format!(
                    "{}={}",
                    oid::dn_short_name(&attr_oid),
                    escape_value(&value)
                ));
                let folded = match text {
                    Some(text) => canonical_value(&text),
                    None => format!("#{}", hex_lower(attr.as_slice())),
                };
                key.push((attr_oid, folded));
            }
            // multi-valued RDNs are unordered sets
            key.sort();
            canonical.push(key);
        }
        Principal {
            canonical,
            raw: name.as_raw().to_vec(),
            display: components.join(", "),
            common_name,
        }
    }

    /// DER encoding of the name, exactly as it appeared in the certificate or CRL.
    pub fn as_raw(&self) -> &[u8] {
        &self.raw
    }

    /// First CN attribute, if the name has one.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }
}

/// Decode an attribute value regardless of which directory string type carries it.
fn attr_text(attr: &AttributeTypeAndValue) -> Option<String> {
    if let Ok(s) = attr.as_str() {
        return Some(s.to_string());
    }
    match attr.attr_value().tag() {
        Tag::BmpString => {
            let units: Vec<u16> = attr
                .as_slice()
                .chunks_exact(2)
                .filter_map(|pair| pair.try_into().ok().map(u16::from_be_bytes))
                .collect();
            String::from_utf16(&units).ok()
        }
        Tag::UniversalString => attr
            .as_slice()
            .chunks_exact(4)
            .map(|quad| {
                quad.try_into()
                    .ok()
                    .map(u32::from_be_bytes)
                    .and_then(char::from_u32)
            })
            .collect(),
        _ => None,
    }
}

fn canonical_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            '=' => out.push_str("\\="),
            _ => out.push(ch),
        }
    }
    out
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Principal").field(&self.display).finish()
    }
}
