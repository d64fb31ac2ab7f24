//! Fluent builder API for creating sync engines.
//!
//! # Example
//!
//! ```rust,no_run
//! use chainsync_engine::SyncEngineBuilder;
//!
//! let config = SyncEngineBuilder::new()
//!     .address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
//!     .start_block(19_000_000)
//!     .max_blocks_per_cycle(500)
//!     .fetch_concurrency(8)
//!     .build_config();
//! ```

use std::sync::Arc;

use chainsync_core::{ChainClient, SyncConfig, SyncError, SyncStorage};

use crate::engine::SyncEngine;

/// Fluent builder for `SyncConfig` and `SyncEngine`.
#[derive(Default)]
pub struct SyncEngineBuilder {
    config: SyncConfig,
}

impl SyncEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from a file).
    pub fn from_config(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Set the watched address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// First block to sync when nothing has been stored yet.
    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = Some(block);
        self
    }

    /// Cap on blocks fetched per cycle.
    pub fn max_blocks_per_cycle(mut self, max: u64) -> Self {
        self.config.max_blocks_per_cycle = Some(max);
        self
    }

    /// Fetch the whole `watermark+1 ..= tip` range in one cycle.
    pub fn unbounded(mut self) -> Self {
        self.config.max_blocks_per_cycle = None;
        self
    }

    /// Number of block requests kept in flight.
    pub fn fetch_concurrency(mut self, n: usize) -> Self {
        self.config.fetch_concurrency = n;
        self
    }

    /// Delay between scheduled cycles in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Build the `SyncConfig`.
    pub fn build_config(self) -> SyncConfig {
        self.config
    }

    /// Validate the configuration and build an engine over `client` and `storage`.
    pub fn build<C, S>(self, client: Arc<C>, storage: Arc<S>) -> Result<SyncEngine, SyncError>
    where
        C: ChainClient + 'static,
        S: SyncStorage + 'static,
    {
        SyncEngine::new(self.config, client, storage)
    }
}
