//! chainsync-rpc — the JSON-RPC side of ChainSync.
//!
//! - [`RpcTransport`] — one request in, one response out
//! - [`HttpTransport`] — `reqwest`-backed HTTP POST transport
//! - [`JsonRpcChainClient`] — implements `chainsync_core::ChainClient` on top
//!   of any transport, owning request ids and response correlation
//! - [`retry`] — backoff policy for callers that re-run failed cycles

pub mod client;
pub mod error;
pub mod http;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::JsonRpcChainClient;
pub use error::TransportError;
pub use http::{HttpClientConfig, HttpTransport};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
