//! Shared counter store abstraction and its Redis implementation.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// The counter store could not be reached or refused the operation.
#[derive(Debug, Error)]
#[error("counter store unavailable: {0}")]
pub struct CounterStoreError(pub String);

/// Atomic increment-and-read with per-key expiry.
///
/// Implementations must make the increment atomic across concurrent
/// callers; an increment followed by a separate read would undercount
/// under races.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key`, refresh its TTL, and return the new count.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, CounterStoreError>;
}

/// Redis-backed counter store. INCR and EXPIRE run in one atomic
/// pipeline so the count and the TTL refresh cannot interleave with
/// other callers.
pub struct RedisCounterStore {
    client: redis::Client,
}

impl RedisCounterStore {
    pub fn connect(url: &str) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(url).map_err(|e| CounterStoreError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, CounterStoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CounterStoreError(e.to_string()))?;

        let (count, _): (u64, i64) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .expire(key, ttl.as_secs() as i64)
            .query_async(&mut conn)
            .await
            .map_err(|e| CounterStoreError(e.to_string()))?;

        Ok(count)
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}
