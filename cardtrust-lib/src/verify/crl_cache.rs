//! Read-through CRL cache keyed by issuer.

use super::crl::RevocationList;
use super::crl_source::CrlLoader;
use crate::principal::Principal;
use crate::status::{CertificateStatusError, StatusCode};
use crate::CardTrustError;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Default maximum number of cached issuers.
pub const DEFAULT_CAPACITY: u64 = 1000;

/// Bounded, write-expiring cache of CRLs in front of a [`CrlLoader`].
///
/// Concurrent misses for the same issuer share one load: the first caller
/// runs the loader and the others wait for its result. Failed loads are not
/// cached. A cached CRL is served unchanged until its entry expires, so its
/// freshness is only re-evaluated on reload.
#[derive(Clone)]
pub struct CrlCache {
    cache: Cache<Principal, Arc<RevocationList>>,
    loader: Arc<dyn CrlLoader>,
}

impl std::fmt::Debug for CrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrlCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl CrlCache {
    pub fn new(loader: Arc<dyn CrlLoader>, capacity: u64, expire_after_write: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(expire_after_write)
            .build();
        CrlCache { cache, loader }
    }

    /// Return the CRL for `issuer`, loading it on a miss or after expiry.
    ///
    /// Any load failure, including "no usable CRL", is reported as
    /// [`StatusCode::CrlMissing`].
    pub fn get(&self, issuer: &Principal) -> Result<Arc<RevocationList>, CertificateStatusError> {
        self.cache
            .try_get_with_by_ref(issuer, || match self.loader.load(issuer) {
                Ok(Some(crl)) => Ok(Arc::new(crl)),
                Ok(None) => Err(CardTrustError::NotFound(format!("CRL for {}", issuer))),
                Err(e) => Err(e),
            })
            .map_err(|e| {
                error!(issuer = %issuer, error = %e, "Error loading CRL");
                CertificateStatusError::new(StatusCode::CrlMissing, "CRL is missing.")
            })
    }

    /// Drop the cached CRL for `issuer`, forcing a reload on the next access.
    pub fn invalidate(&self, issuer: &Principal) {
        self.cache.invalidate(issuer);
    }

    /// Whether a CRL for `issuer` is currently cached.
    pub fn contains(&self, issuer: &Principal) -> bool {
        self.cache.contains_key(issuer)
    }
}
