//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint
//! - Broadcast raw signed envelopes and fetch receipts
//! - Bound every call with a timeout
//!
//! One provider, one round trip per operation, no retries: a blind
//! rebroadcast can double-submit a transaction that is already mined.
//! Retrying non-mutating reads is left to the caller.

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{RpcError, RpcResult};
use crate::config::schema::RpcConfig;

/// JSON-RPC gateway client.
#[derive(Clone)]
pub struct RpcClient {
    provider: Arc<dyn Provider + Send + Sync>,
    url: String,
    /// Broadcast is fire-and-forget; its timeout is the shorter one.
    broadcast_timeout: Duration,
    /// Receipt fetches tolerate node lag.
    receipt_timeout: Duration,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> RpcResult<Self> {
        let url: url::Url = config
            .url
            .parse()
            .map_err(|e| RpcError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        let provider =
            Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>;

        Ok(Self {
            provider,
            url: config.url.clone(),
            broadcast_timeout: Duration::from_secs(config.broadcast_timeout_secs),
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
        })
    }

    /// Broadcast a raw signed envelope, returning the transaction hash.
    pub async fn broadcast(&self, raw: &[u8]) -> RpcResult<TxHash> {
        let fut = self.provider.send_raw_transaction(raw);
        match timeout(self.broadcast_timeout, fut).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(e)) => Err(RpcError::Upstream(e.to_string())),
            Err(_) => Err(RpcError::Timeout(self.broadcast_timeout.as_secs())),
        }
    }

    /// Fetch the receipt for a transaction hash. `None` means not yet
    /// mined, which is not an error.
    pub async fn fetch_receipt(&self, hash: TxHash) -> RpcResult<Option<TransactionReceipt>> {
        let fut = self.provider.get_transaction_receipt(hash);
        match timeout(self.receipt_timeout, fut).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(e)) => Err(RpcError::Upstream(e.to_string())),
            Err(_) => Err(RpcError::Timeout(self.receipt_timeout.as_secs())),
        }
    }

    /// Read-only contract call at the latest block.
    pub async fn call(&self, to: Address, data: Bytes) -> RpcResult<Bytes> {
        let request = TransactionRequest::default().to(to).input(data.into());
        let fut = self.provider.call(request);
        match timeout(self.receipt_timeout, fut).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RpcError::Upstream(e.to_string())),
            Err(_) => Err(RpcError::Timeout(self.receipt_timeout.as_secs())),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("broadcast_timeout", &self.broadcast_timeout)
            .field("receipt_timeout", &self.receipt_timeout)
            .finish()
    }
}
