//! Request orchestration.

pub mod orchestrator;

pub use orchestrator::{parse_raw_envelope, parse_tx_hash, Guard, GuardError};
