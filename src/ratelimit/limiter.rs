//! Dual-dimension fixed-window limiter.
//!
//! # Responsibilities
//! - Count submissions per source IP and per credential digest in
//!   discrete 60-second windows
//! - Fail closed: an enabled limiter without a reachable store denies
//!   the request, never bypasses the check
//!
//! Both dimensions are AND-combined: either counter exceeding its
//! ceiling denies the request. The credential is never stored raw; its
//! key carries a short SHA-256 digest.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::schema::RateLimitConfig;
use crate::observability::metrics;
use crate::ratelimit::store::{CounterStore, CounterStoreError};

/// Window size shared by both counters.
pub const WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Denied; the caller should back off and resubmit after the
    /// current window rolls over.
    Limited { retry_after_secs: u64 },
}

#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("rate limiting enabled but no counter store configured")]
    Unconfigured,
    #[error(transparent)]
    Store(#[from] CounterStoreError),
}

pub struct RateLimiter {
    store: Option<Arc<dyn CounterStore>>,
    enabled: bool,
    ip_per_minute: u64,
    key_per_minute: u64,
    ttl: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, store: Option<Arc<dyn CounterStore>>) -> Self {
        Self {
            store,
            enabled: config.enabled,
            ip_per_minute: config.ip_per_minute,
            key_per_minute: config.key_per_minute,
            // TTL runs slightly past the window to tolerate clock and
            // storage skew.
            ttl: Duration::from_secs(config.ttl_secs.max(WINDOW_SECS)),
        }
    }

    /// Increment both counters for the current window and decide.
    pub async fn check(
        &self,
        source_ip: &str,
        credential: Option<&str>,
    ) -> Result<RateDecision, LimiterError> {
        if !self.enabled {
            return Ok(RateDecision::Allowed);
        }
        let store = self.store.as_deref().ok_or(LimiterError::Unconfigured)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.check_at(store, source_ip, credential, now).await
    }

    async fn check_at(
        &self,
        store: &dyn CounterStore,
        source_ip: &str,
        credential: Option<&str>,
        now: u64,
    ) -> Result<RateDecision, LimiterError> {
        let window = now / WINDOW_SECS;
        let retry_after_secs = WINDOW_SECS - (now % WINDOW_SECS);

        let ip_key = format!("rl:sendraw:{source_ip}:{window}");
        let kid = credential_digest(credential);
        let cred_key = format!("rl:sendraw:key:{kid}:{window}");

        let ip_count = store.increment(&ip_key, self.ttl).await?;
        let cred_count = store.increment(&cred_key, self.ttl).await?;

        if ip_count > self.ip_per_minute {
            tracing::warn!(source_ip, count = ip_count, "rate limit exceeded");
            metrics::record_rate_limited("source_ip");
            return Ok(RateDecision::Limited { retry_after_secs });
        }
        if cred_count > self.key_per_minute {
            tracing::warn!(credential_id = %kid, count = cred_count, "rate limit exceeded");
            metrics::record_rate_limited("credential");
            return Ok(RateDecision::Limited { retry_after_secs });
        }
        Ok(RateDecision::Allowed)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("enabled", &self.enabled)
            .field("ip_per_minute", &self.ip_per_minute)
            .field("key_per_minute", &self.key_per_minute)
            .finish_non_exhaustive()
    }
}

/// Short non-reversible digest of the caller credential, so raw secrets
/// never appear in storage keys.
fn credential_digest(credential: Option<&str>) -> String {
    match credential {
        None => "none".to_string(),
        Some(cred) => {
            let digest = Sha256::digest(cred.as_bytes());
            alloy::primitives::hex::encode(digest)[..12].to_string()
        }
    }
}
