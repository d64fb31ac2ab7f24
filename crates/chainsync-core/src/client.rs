//! The `ChainClient` trait — what the engine needs from a node.

use std::sync::Arc;

use alloy_primitives::U256;
use async_trait::async_trait;

use crate::error::SyncError;
use crate::hex::BlockTag;
use crate::types::Block;

/// Node access used by the sync engine. Each call is one JSON-RPC request;
/// implementations do not retry.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `eth_blockNumber`.
    async fn fetch_chain_tip(&self) -> Result<u64, SyncError>;

    /// `eth_getBlockByNumber(height, true)`.
    async fn fetch_block(&self, height: u64) -> Result<Block, SyncError>;

    /// `eth_gasPrice`.
    async fn fetch_gas_price(&self) -> Result<U256, SyncError>;

    /// `eth_getBalance(address, tag)`.
    async fn fetch_balance(&self, address: &str, tag: BlockTag) -> Result<U256, SyncError>;
}

#[async_trait]
impl<C: ChainClient + ?Sized> ChainClient for Arc<C> {
    async fn fetch_chain_tip(&self) -> Result<u64, SyncError> {
        (**self).fetch_chain_tip().await
    }

    async fn fetch_block(&self, height: u64) -> Result<Block, SyncError> {
        (**self).fetch_block(height).await
    }

    async fn fetch_gas_price(&self) -> Result<U256, SyncError> {
        (**self).fetch_gas_price().await
    }

    async fn fetch_balance(&self, address: &str, tag: BlockTag) -> Result<U256, SyncError> {
        (**self).fetch_balance(address, tag).await
    }
}
