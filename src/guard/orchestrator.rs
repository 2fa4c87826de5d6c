//! The guard orchestrator.
//!
//! # Responsibilities
//! - Submit path: input shape → rate limiter → decode → policy → broadcast
//! - Receipt path: hash shape → fetch → allowlist re-check → log parse
//! - Map every subsystem failure into the request-level [`GuardError`]
//!   taxonomy
//!
//! Any failure short-circuits the remaining steps. Nothing is retried
//! here.

use std::sync::Arc;

use alloy::primitives::{hex, TxHash};
use thiserror::Error;

use crate::blockchain::{RpcClient, RpcError};
use crate::envelope::{self, DecodeError};
use crate::policy::{AmountCheck, Policy, PolicyError, PolicyViolation};
use crate::ratelimit::{LimiterError, RateDecision, RateLimiter};
use crate::receipt::{self, ReceiptSummary};

/// Request-level error taxonomy. The HTTP layer maps each variant to a
/// status code; the variants themselves decide what the caller learns.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Malformed request; reported with enough detail to fix it.
    #[error("{0}")]
    Input(String),

    /// The transfer policy refused the request. Terminal.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// Over quota; the caller should back off and resubmit.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Server-side misconfiguration. The relay fails closed rather than
    /// proceed under weakened security.
    #[error("configuration error: {0}")]
    Config(String),

    /// The blockchain node failed or reported an error.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<DecodeError> for GuardError {
    fn from(e: DecodeError) -> Self {
        GuardError::Input(format!("rawTx decode failed: {e}"))
    }
}

impl From<PolicyError> for GuardError {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::EmptyAllowlist => GuardError::Config(e.to_string()),
            PolicyError::Violation(v) => GuardError::Policy(v),
        }
    }
}

impl From<LimiterError> for GuardError {
    fn from(e: LimiterError) -> Self {
        GuardError::Config(e.to_string())
    }
}

impl From<RpcError> for GuardError {
    fn from(e: RpcError) -> Self {
        GuardError::Upstream(e.to_string())
    }
}

/// Sequences the pipeline components. Holds no mutable state; every
/// entity it produces lives and dies within one request.
pub struct Guard {
    policy: Policy,
    limiter: RateLimiter,
    rpc: Arc<RpcClient>,
}

impl Guard {
    pub fn new(policy: Policy, limiter: RateLimiter, rpc: Arc<RpcClient>) -> Self {
        Self {
            policy,
            limiter,
            rpc,
        }
    }

    /// Guard and broadcast a raw signed envelope.
    pub async fn submit(
        &self,
        raw: &str,
        source_ip: &str,
        credential: Option<&str>,
    ) -> Result<TxHash, GuardError> {
        let bytes = parse_raw_envelope(raw)?;

        match self.limiter.check(source_ip, credential).await? {
            RateDecision::Allowed => {}
            RateDecision::Limited { retry_after_secs } => {
                return Err(GuardError::RateLimited { retry_after_secs });
            }
        }

        let envelope = envelope::decode_legacy(&bytes)?;
        let outcome = self.policy.evaluate(&envelope)?;
        if let AmountCheck::Skipped(reason) = outcome.amount_check {
            tracing::warn!(reason, "amount ceiling check skipped");
        }

        let hash = self.rpc.broadcast(&bytes).await?;
        tracing::info!(tx_hash = %hash, to = ?envelope.to, "transaction broadcast");
        Ok(hash)
    }

    /// Look up and summarize a receipt. `Ok(None)` means the
    /// transaction is not yet mined.
    pub async fn receipt(&self, hash: &str) -> Result<Option<ReceiptSummary>, GuardError> {
        let hash = parse_tx_hash(hash)?;
        let Some(receipt) = self.rpc.fetch_receipt(hash).await? else {
            return Ok(None);
        };
        let summary = receipt::summarize(&receipt, self.policy.allowlist())?;
        Ok(Some(summary))
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("policy", &self.policy)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// `0x` + even-length hex, at least five bytes so a selector fits.
pub fn parse_raw_envelope(raw: &str) -> Result<Vec<u8>, GuardError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| GuardError::Input("rawTx must be a 0x-prefixed hex string".to_string()))?;
    if digits.len() < 10 || digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(GuardError::Input(
            "rawTx must be 0x followed by even-length hex, at least 5 bytes".to_string(),
        ));
    }
    hex::decode(digits).map_err(|e| GuardError::Input(format!("rawTx is not valid hex: {e}")))
}

/// `0x` + exactly 64 hex digits.
pub fn parse_tx_hash(s: &str) -> Result<TxHash, GuardError> {
    let digits = s
        .strip_prefix("0x")
        .filter(|d| d.len() == 64 && d.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| GuardError::Input("tx_hash must be 0x + 64 hex chars".to_string()))?;
    let bytes =
        hex::decode(digits).map_err(|e| GuardError::Input(format!("tx_hash is not hex: {e}")))?;
    Ok(TxHash::from_slice(&bytes))
}
