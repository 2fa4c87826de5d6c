//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Refuse configurations that would weaken security: a missing
//!   credential, an empty allowlist, or an enabled limiter without a
//!   counter store are startup errors, never silently-permissive
//!   defaults
//!
//! Returns all validation errors, not just the first.

use thiserror::Error;

use crate::config::schema::GuardianConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rpc.url must be set")]
    MissingRpcUrl,
    #[error("rpc.url is not a valid url: {0}")]
    InvalidRpcUrl(String),
    #[error("auth.internal_api_key must be set")]
    MissingInternalKey,
    #[error("policy.token_allowlist must not be empty")]
    EmptyAllowlist,
    #[error("policy.token_allowlist entry is not an address: {0}")]
    InvalidAllowlistEntry(String),
    #[error("policy.max_amount_raw is not a decimal integer: {0}")]
    InvalidMaxAmount(String),
    #[error("rate_limit.redis_url must be set when rate limiting is enabled")]
    MissingRedisUrl,
    #[error("chain_info.token_address is not an address: {0}")]
    InvalidTokenAddress(String),
}

/// Validate a loaded configuration, collecting every problem.
pub fn validate_config(config: &GuardianConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rpc.url.trim().is_empty() {
        errors.push(ValidationError::MissingRpcUrl);
    } else if config.rpc.url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::InvalidRpcUrl(config.rpc.url.clone()));
    }

    if config.auth.internal_api_key.trim().is_empty() {
        errors.push(ValidationError::MissingInternalKey);
    }

    if config.policy.token_allowlist.is_empty() {
        errors.push(ValidationError::EmptyAllowlist);
    }
    if let Err(e) = config.policy.allowlist_addresses() {
        errors.push(e);
    }
    if let Err(e) = config.policy.max_amount() {
        errors.push(e);
    }

    if config.rate_limit.enabled && config.rate_limit.redis_url.trim().is_empty() {
        errors.push(ValidationError::MissingRedisUrl);
    }

    if let Err(e) = config.chain_info.token() {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
