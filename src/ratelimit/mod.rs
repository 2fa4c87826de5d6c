//! Fixed-window rate limiting over a shared counter store.

pub mod limiter;
pub mod store;

pub use limiter::{LimiterError, RateDecision, RateLimiter};
pub use store::{CounterStore, CounterStoreError, RedisCounterStore};
