//! Transfer policy enforcement.
//!
//! # Responsibilities
//! - Apply the ordered checks (chain id, destination allowlist, call
//!   selector, amount ceiling) to a decoded envelope
//! - Short-circuit on the first violated invariant so the reported
//!   reason is always the earliest failure
//!
//! The policy is an immutable value built once at startup from
//! validated configuration and passed into the pipeline; nothing here
//! reads ambient state.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::config::schema::PolicyConfig;
use crate::config::validation::ValidationError;
use crate::envelope::DecodedEnvelope;

/// Selector for ERC-20 `transfer(address,uint256)`, the only call this
/// relay will forward. A single hard-coded selector, not a configurable
/// set: the relay's sole sanctioned action is a token transfer.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// A request the policy refuses. Terminal for the request; the message
/// names the violated invariant without echoing configuration back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("chain id not allowed: {0}")]
    ChainNotAllowed(u64),
    #[error("contract creation not allowed")]
    ContractCreation,
    #[error("destination not allowed: {0}")]
    DestinationNotAllowed(Address),
    #[error("only ERC-20 transfer allowed")]
    SelectorNotAllowed,
    #[error("transfer amount {0} exceeds the configured ceiling")]
    AmountOverCeiling(U256),
}

/// Evaluation failure: either the request violated policy, or the
/// policy itself is unusable (an empty allowlist is a configuration
/// error, never an implicit allow-all or deny-all).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("token allowlist is empty")]
    EmptyAllowlist,
    #[error(transparent)]
    Violation(#[from] PolicyViolation),
}

/// How the amount ceiling check concluded for an allowed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountCheck {
    /// No ceiling is configured.
    Unbounded,
    /// Amount parsed and is at or under the ceiling.
    Within(U256),
    /// Call data too short to carry an amount argument; the check is
    /// skipped rather than failing the request. The selector check has
    /// already confirmed a plausible transfer shape.
    Skipped(&'static str),
}

/// Result of a passed evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub amount_check: AmountCheck,
}

/// Immutable transfer policy.
#[derive(Debug, Clone)]
pub struct Policy {
    chain_id: u64,
    allowlist: Vec<Address>,
    max_amount: Option<U256>,
}

impl Policy {
    pub fn new(chain_id: u64, allowlist: Vec<Address>, max_amount: Option<U256>) -> Self {
        Self {
            chain_id,
            allowlist,
            max_amount,
        }
    }

    /// Build a policy from validated configuration.
    pub fn from_config(config: &PolicyConfig, chain_id: u64) -> Result<Self, ValidationError> {
        Ok(Self::new(
            chain_id,
            config.allowlist_addresses()?,
            config.max_amount()?,
        ))
    }

    pub fn allowlist(&self) -> &[Address] {
        &self.allowlist
    }

    /// Run the ordered checks against a decoded envelope.
    pub fn evaluate(&self, envelope: &DecodedEnvelope) -> Result<PolicyOutcome, PolicyError> {
        // 1. Chain id, when the signature encodes one. Pre-chain-id
        //    envelopes pass through (recorded policy choice).
        if let Some(id) = envelope.chain_id {
            if id != self.chain_id {
                return Err(PolicyViolation::ChainNotAllowed(id).into());
            }
        }

        // 2. Destination allowlist.
        if self.allowlist.is_empty() {
            return Err(PolicyError::EmptyAllowlist);
        }
        let to = envelope.to.ok_or(PolicyViolation::ContractCreation)?;
        if !self.allowlist.contains(&to) {
            return Err(PolicyViolation::DestinationNotAllowed(to).into());
        }

        // 3. Call selector.
        if envelope.data.len() < 4 || envelope.data[..4] != TRANSFER_SELECTOR {
            return Err(PolicyViolation::SelectorNotAllowed.into());
        }

        // 4. Optional amount ceiling.
        let amount_check = match self.max_amount {
            None => AmountCheck::Unbounded,
            Some(ceiling) => match extract_transfer_amount(&envelope.data) {
                Some(amount) if amount > ceiling => {
                    return Err(PolicyViolation::AmountOverCeiling(amount).into());
                }
                Some(amount) => AmountCheck::Within(amount),
                None => AmountCheck::Skipped("call data shorter than transfer(address,uint256)"),
            },
        };

        Ok(PolicyOutcome { amount_check })
    }
}

/// The amount is the second 32-byte argument of the transfer call.
fn extract_transfer_amount(data: &[u8]) -> Option<U256> {
    if data.len() < 4 + 32 + 32 {
        return None;
    }
    Some(U256::from_be_slice(&data[36..68]))
}
