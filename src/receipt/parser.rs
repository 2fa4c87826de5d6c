//! Receipt summarization and transfer-event extraction.
//!
//! A receipt can be requested for any hash, not only ones this relay
//! submitted, so the destination allowlist is re-applied here before
//! any log is parsed.

use alloy::primitives::{b256, Address, B256};
use alloy::rpc::types::TransactionReceipt;
use serde::Serialize;

use crate::policy::PolicyViolation;

/// Topic 0 of the ERC-20 `Transfer(address,address,uint256)` event.
pub const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

/// One Transfer event emitted by the receipt's destination contract.
/// The value is passed through as the raw log-data hex for the caller
/// to interpret.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value_hex: String,
}

/// Structured view of a mined transaction's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptSummary {
    pub status: bool,
    pub from: Address,
    pub to: Option<Address>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<u64>,
    #[serde(rename = "gasUsed")]
    pub gas_used: u64,
    #[serde(rename = "effectiveGasPrice")]
    pub effective_gas_price: u128,
    pub transfers: Vec<TransferEvent>,
}

/// Summarize a fetched receipt, keeping only Transfer events emitted by
/// the receipt's own destination contract.
pub fn summarize(
    receipt: &TransactionReceipt,
    allowlist: &[Address],
) -> Result<ReceiptSummary, PolicyViolation> {
    let to = receipt.to;
    if let Some(to) = to {
        if !allowlist.is_empty() && !allowlist.contains(&to) {
            return Err(PolicyViolation::DestinationNotAllowed(to));
        }
    }

    let mut transfers = Vec::new();
    if let Some(emitter) = to {
        for log in receipt.inner.logs() {
            if log.inner.address != emitter {
                continue;
            }
            let topics = log.inner.data.topics();
            if topics.len() < 3 || topics[0] != TRANSFER_TOPIC {
                continue;
            }
            transfers.push(TransferEvent {
                from: Address::from_slice(&topics[1][12..]),
                to: Address::from_slice(&topics[2][12..]),
                value_hex: format!(
                    "0x{}",
                    alloy::primitives::hex::encode(&log.inner.data.data)
                ),
            });
        }
    }

    Ok(ReceiptSummary {
        status: receipt.inner.status(),
        from: receipt.from,
        to,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        transfers,
    })
}
