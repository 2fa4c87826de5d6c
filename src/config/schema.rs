//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file.
//! The loaded value is immutable: it is constructed once at process
//! start and passed into each component constructor, never read from
//! ambient state inside pipeline logic.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardianConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Blockchain RPC endpoint settings.
    pub rpc: RpcConfig,

    /// Rate limiting settings.
    pub rate_limit: RateLimitConfig,

    /// Transfer policy settings.
    pub policy: PolicyConfig,

    /// Internal caller authentication.
    pub auth: AuthConfig,

    /// Read-only chain-info endpoints.
    pub chain_info: ChainInfoConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 1024 * 1024,
        }
    }
}

/// Blockchain RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL. Required.
    pub url: String,

    /// The single chain id this relay will broadcast to.
    pub chain_id: u64,

    /// Timeout for broadcast calls in seconds.
    pub broadcast_timeout_secs: u64,

    /// Timeout for receipt and read calls in seconds.
    pub receipt_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            chain_id: 56,
            broadcast_timeout_secs: 10,
            receipt_timeout_secs: 30,
        }
    }
}

/// Rate limiting configuration. Enabled by default; the relay fails
/// closed if enabled without a reachable counter store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Disabling this switch is the only way to skip the check.
    pub enabled: bool,

    /// Counter store address (e.g., "redis://127.0.0.1/").
    pub redis_url: String,

    /// Per-minute ceiling per source IP.
    pub ip_per_minute: u64,

    /// Per-minute ceiling per caller credential. One credential may
    /// serve many legitimate sources, so this is the looser ceiling.
    pub key_per_minute: u64,

    /// Counter TTL in seconds, slightly past the 60-second window.
    pub ttl_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: String::new(),
            ip_per_minute: 10,
            key_per_minute: 60,
            ttl_secs: 70,
        }
    }
}

/// Transfer policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Permitted destination contract addresses. Must be non-empty;
    /// parsed to addresses so letter case never matters.
    pub token_allowlist: Vec<String>,

    /// Optional transfer-amount ceiling in raw integer units, as a
    /// decimal string.
    pub max_amount_raw: Option<String>,
}

impl PolicyConfig {
    pub fn allowlist_addresses(&self) -> Result<Vec<Address>, ValidationError> {
        self.token_allowlist
            .iter()
            .map(|entry| {
                entry
                    .trim()
                    .parse()
                    .map_err(|_| ValidationError::InvalidAllowlistEntry(entry.clone()))
            })
            .collect()
    }

    pub fn max_amount(&self) -> Result<Option<U256>, ValidationError> {
        self.max_amount_raw
            .as_deref()
            .map(|raw| {
                U256::from_str_radix(raw.trim(), 10)
                    .map_err(|_| ValidationError::InvalidMaxAmount(raw.to_string()))
            })
            .transpose()
    }
}

/// Internal caller authentication.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret presented in the X-Guardian-Key header. Required.
    pub internal_api_key: String,
}

/// Read-only chain-info endpoints. Disabled unless a token address is
/// configured.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ChainInfoConfig {
    pub token_address: Option<String>,
}

impl ChainInfoConfig {
    pub fn token(&self) -> Result<Option<Address>, ValidationError> {
        self.token_address
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ValidationError::InvalidTokenAddress(raw.to_string()))
            })
            .transpose()
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
