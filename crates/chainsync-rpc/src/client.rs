//! `ChainClient` over JSON-RPC.
//!
//! Each operation issues exactly one request. Request ids come from a
//! per-client counter and every response is checked against the id it
//! answers.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use chainsync_core::hex::{self, BlockTag};
use chainsync_core::types::{Block, RawTransaction};
use chainsync_core::{ChainClient, SyncError, U256};

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, RpcId};
use crate::transport::RpcTransport;

/// Block object as returned by `eth_getBlockByNumber(.., true)`.
#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: String,
    hash: Option<String>,
    timestamp: String,
    /// Kept as raw values so one undecodable entry doesn't sink the block.
    #[serde(default)]
    transactions: Vec<Value>,
}

/// JSON-RPC implementation of [`ChainClient`].
pub struct JsonRpcChainClient<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> JsonRpcChainClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and return its `result` member.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self.transport.send(JsonRpcRequest::new(id, method, params)).await?;

        let expected = RpcId::Number(id);
        // Some nodes answer parse-level errors with a null id.
        if resp.id != expected && !(resp.id == RpcId::Null && resp.error.is_some()) {
            return Err(TransportError::IdMismatch {
                expected,
                actual: resp.id,
            });
        }
        resp.into_result()
    }

    async fn call_quantity(&self, method: &str, params: Vec<Value>) -> Result<String, SyncError> {
        match self.call(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(SyncError::Decoding(format!(
                "{method}: expected hex string, got {other}"
            ))),
        }
    }
}

/// Convert the block's transaction list entry by entry.
///
/// A bare hash means the node ignored the full-objects flag, which makes the
/// whole block unusable. An object whose fields have the wrong JSON types is
/// skipped with a warning and the rest of the block is kept.
fn decode_transactions(
    height: u64,
    entries: Vec<Value>,
) -> Result<Vec<RawTransaction>, SyncError> {
    let mut out = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            return Err(SyncError::Decoding(format!(
                "block {height}: transaction {position} is not an object: {entry}"
            )));
        }
        let hash = entry.get("hash").and_then(Value::as_str).map(str::to_owned);
        match serde_json::from_value::<RawTransaction>(entry) {
            Ok(tx) => out.push(tx),
            Err(e) => warn!(
                block = height,
                position,
                hash = hash.as_deref().unwrap_or("?"),
                error = %e,
                "skipping undecodable transaction"
            ),
        }
    }
    Ok(out)
}

#[async_trait]
impl<T: RpcTransport> ChainClient for JsonRpcChainClient<T> {
    async fn fetch_chain_tip(&self) -> Result<u64, SyncError> {
        let raw = self.call_quantity("eth_blockNumber", vec![]).await?;
        Ok(hex::decode_int(&raw)?)
    }

    async fn fetch_block(&self, height: u64) -> Result<Block, SyncError> {
        let tag = BlockTag::Number(height);
        let value = self
            .call("eth_getBlockByNumber", vec![json!(tag.encode()), json!(true)])
            .await?;
        if value.is_null() {
            return Err(SyncError::BlockUnavailable { height });
        }

        let raw: RpcBlock = serde_json::from_value(value)
            .map_err(|e| SyncError::Decoding(format!("block {height}: {e}")))?;
        let number = hex::decode_int(&raw.number)?;
        if number != height {
            return Err(SyncError::Decoding(format!(
                "requested block {height}, node returned {number}"
            )));
        }

        let timestamp = hex::decode_int(&raw.timestamp)?;
        let transactions = decode_transactions(height, raw.transactions)?;

        debug!(height, transactions = transactions.len(), "block fetched");
        Ok(Block {
            number,
            hash: raw.hash,
            timestamp,
            transactions,
        })
    }

    async fn fetch_gas_price(&self) -> Result<U256, SyncError> {
        let raw = self.call_quantity("eth_gasPrice", vec![]).await?;
        Ok(hex::decode_big(&raw)?)
    }

    async fn fetch_balance(&self, address: &str, tag: BlockTag) -> Result<U256, SyncError> {
        let raw = self
            .call_quantity("eth_getBalance", vec![json!(address), json!(tag.encode())])
            .await?;
        Ok(hex::decode_big(&raw)?)
    }
}
