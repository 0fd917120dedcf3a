//! Cache-consult-then-probe decision path.

use crate::config::TtlPolicy;
use crate::error::ScanResult;
use crate::scanner::traits::{PortStatus, Prober, Resolution};
use crate::storage::TtlStore;
use crate::types::Target;
use std::sync::Arc;
use tracing::trace;

/// Resolves a target's status from the cache, probing only on a miss.
pub struct CacheGateway {
    store: Arc<dyn TtlStore>,
    prober: Arc<dyn Prober>,
    ttl: TtlPolicy,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn TtlStore>, prober: Arc<dyn Prober>, ttl: TtlPolicy) -> Self {
        Self { store, prober, ttl }
    }

    pub fn ttl(&self) -> TtlPolicy {
        self.ttl
    }

    /// Resolve one target.
    ///
    /// An unexpired cache entry is returned as is. Otherwise the target is
    /// probed and the result written back with the TTL for its outcome.
    /// Probe errors are returned without touching the cache; a failed write
    /// fails the whole call so the caller never reports an uncached result.
    pub async fn resolve(&self, target: &Target) -> ScanResult<Resolution> {
        let key = target.cache_key();

        if let Some(byte) = self.store.get(&key)? {
            let resolution = Resolution::cached(PortStatus::from_byte(byte));
            trace!(key = %key, status = %resolution.status, "cache hit");
            return Ok(resolution);
        }

        let status = self.prober.probe(target).await?;
        let ttl = self.ttl.ttl_for(status);
        self.store.set(&key, status.as_byte(), ttl)?;
        trace!(key = %key, status = %status, ttl = ?ttl, "cached probe result");

        Ok(Resolution::probed(status))
    }
}
