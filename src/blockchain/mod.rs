//! Blockchain JSON-RPC gateway.

pub mod client;
pub mod token;
pub mod types;

pub use client::RpcClient;
pub use types::{RpcError, RpcResult};
