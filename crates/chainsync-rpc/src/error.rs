//! Transport-level error types.

use thiserror::Error;

use chainsync_core::SyncError;

use crate::request::{JsonRpcError, RpcId};

/// Errors that can occur during an RPC transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, non-2xx status, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The response carried neither `result` nor `error`.
    #[error("Response has neither result nor error")]
    MissingResult,

    /// The response answers a different request.
    #[error("Response id {actual} does not match request id {expected}")]
    IdMismatch { expected: RpcId, actual: RpcId },
}

impl TransportError {
    /// Returns `true` if this error is retryable (transient).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }

    /// Returns `true` if this is a node-side execution error (not retryable).
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http(_) | TransportError::Timeout { .. } => {
                SyncError::Transport(err.to_string())
            }
            TransportError::Rpc(e) => SyncError::Rpc {
                code: e.code,
                message: e.message,
            },
            TransportError::Deserialization(_)
            | TransportError::MissingResult
            | TransportError::IdMismatch { .. } => SyncError::Decoding(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_into_sync_taxonomy() {
        let e: SyncError = TransportError::Http("connection refused".into()).into();
        assert!(matches!(e, SyncError::Transport(_)));
        assert!(e.is_retryable());

        let e: SyncError = TransportError::Timeout { ms: 30_000 }.into();
        assert!(matches!(e, SyncError::Transport(_)));

        let e: SyncError = TransportError::Rpc(JsonRpcError {
            code: -32602,
            message: "invalid params".into(),
            data: None,
        })
        .into();
        assert!(matches!(e, SyncError::Rpc { code: -32602, .. }));
        assert!(!e.is_retryable());

        let e: SyncError = TransportError::MissingResult.into();
        assert!(matches!(e, SyncError::Decoding(_)));

        let e: SyncError = TransportError::IdMismatch {
            expected: RpcId::Number(1),
            actual: RpcId::Number(2),
        }
        .into();
        assert!(matches!(e, SyncError::Decoding(_)));
    }
}
