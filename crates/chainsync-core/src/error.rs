//! Error types for the chainsync pipeline.

use thiserror::Error;

use crate::hex::HexError;

/// Errors that can occur while syncing or reading account state.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network-level failure (connection refused, timeout, bad HTTP status).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node rejected the call with a JSON-RPC error envelope.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response was neither a success nor an error envelope, or its
    /// payload did not have the expected shape.
    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error(transparent)]
    MalformedHex(#[from] HexError),

    /// The node answered `null` for a block it should have.
    #[error("Block {height} is not available from the node")]
    BlockUnavailable { height: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    /// Another cycle is already running against the same watermark.
    #[error("A sync cycle is already in progress")]
    CycleInProgress,

    /// A block in the cycle's range could not be fetched; nothing was committed.
    #[error("Sync range abandoned at block {height}: {source}")]
    RangeAbandoned {
        height: u64,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns `true` if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::BlockUnavailable { .. } | Self::CycleInProgress => true,
            Self::RangeAbandoned { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns `true` if the node itself rejected the request.
    pub fn is_execution_error(&self) -> bool {
        match self {
            Self::Rpc { .. } => true,
            Self::RangeAbandoned { source, .. } => source.is_execution_error(),
            _ => false,
        }
    }

    /// Shorthand used by storage backends to wrap driver errors.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}
