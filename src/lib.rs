//! Guarded transaction relay library.
//!
//! Accepts already-signed legacy transaction envelopes from internal
//! callers, verifies them against a transfer policy, enforces
//! per-caller throughput limits, and forwards them to a blockchain
//! node; also summarizes on-chain receipts.

pub mod blockchain;
pub mod config;
pub mod envelope;
pub mod guard;
pub mod http;
pub mod observability;
pub mod policy;
pub mod ratelimit;
pub mod receipt;
pub mod security;

pub use config::GuardianConfig;
pub use guard::{Guard, GuardError};
pub use http::HttpServer;
