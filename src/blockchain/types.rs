//! RPC gateway error definitions.

use thiserror::Error;

/// Errors from the JSON-RPC gateway. Upstream error text is preserved
/// for diagnosis; nothing here is retried.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Upstream node reported an error or the transport failed.
    #[error("rpc error: {0}")]
    Upstream(String),

    /// The request did not complete within its bounded timeout.
    #[error("rpc timeout after {0} seconds")]
    Timeout(u64),

    /// The configured endpoint URL could not be parsed.
    #[error("invalid rpc url: {0}")]
    InvalidUrl(String),
}

/// Result type for gateway operations.
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_preserves_upstream_text() {
        let err = RpcError::Upstream("nonce too low".to_string());
        assert_eq!(err.to_string(), "rpc error: nonce too low");

        let err = RpcError::Timeout(10);
        assert_eq!(err.to_string(), "rpc timeout after 10 seconds");
    }
}
