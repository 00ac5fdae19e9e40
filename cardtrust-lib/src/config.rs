//! Engine configuration.

use crate::CardTrustError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Paths and cache policy consumed by [`crate::CertificateChecker::from_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Directory of root CA certificates (walked recursively).
    pub ca_dir: PathBuf,

    /// Directory of intermediate CA certificates (walked recursively).
    pub ica_dir: PathBuf,

    /// Directory of CRL files (walked recursively on every cache reload).
    pub crl_dir: PathBuf,

    /// Maximum number of issuers kept in the CRL cache.
    #[serde(default = "default_crl_cache_capacity")]
    pub crl_cache_capacity: u64,

    /// Time after insertion at which a cached CRL is reloaded, in milliseconds.
    #[serde(default = "default_crl_cache_expiration_ms")]
    pub crl_cache_expiration_ms: u64,

    /// Accept an outdated CRL when no up-to-date one exists. Testing only.
    #[serde(default)]
    pub allow_stale_crl: bool,
}

fn default_crl_cache_capacity() -> u64 {
    crate::verify::DEFAULT_CAPACITY
}

fn default_crl_cache_expiration_ms() -> u64 {
    60_000
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            ca_dir: PathBuf::from("/etc/cardtrust/ca"),
            ica_dir: PathBuf::from("/etc/cardtrust/ica"),
            crl_dir: PathBuf::from("/var/lib/cardtrust/crl"),
            crl_cache_capacity: default_crl_cache_capacity(),
            crl_cache_expiration_ms: default_crl_cache_expiration_ms(),
            allow_stale_crl: false,
        }
    }
}

impl CheckerConfig {
    /// Load and validate a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, CardTrustError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CardTrustError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, CardTrustError> {
        let config: CheckerConfig =
            toml::from_str(content).map_err(|e| CardTrustError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML (used to write an example config).
    pub fn to_toml_string(&self) -> Result<String, CardTrustError> {
        toml::to_string_pretty(self).map_err(|e| CardTrustError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), CardTrustError> {
        for (name, path) in [
            ("ca_dir", &self.ca_dir),
            ("ica_dir", &self.ica_dir),
            ("crl_dir", &self.crl_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(CardTrustError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.crl_cache_capacity == 0 {
            return Err(CardTrustError::Config(
                "crl_cache_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn crl_cache_expiration(&self) -> Duration {
        Duration::from_millis(self.crl_cache_expiration_ms)
    }
}
