//! The `RpcTransport` trait — how a JSON-RPC request reaches a node.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Sends one JSON-RPC request and returns the parsed response envelope.
///
/// Implementations must be `Send + Sync` for use across Tokio tasks and must
/// not retry; retry policy belongs to the caller.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;
}
