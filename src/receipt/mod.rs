//! Receipt summarization.

pub mod parser;

pub use parser::{summarize, ReceiptSummary, TransferEvent, TRANSFER_TOPIC};
