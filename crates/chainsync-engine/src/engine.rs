//! The sync engine.
//!
//! # Cycle
//! 1. Read the watermark `w` (or the configured starting point).
//! 2. Fetch the chain tip `t`. Stop if `t <= w`.
//! 3. Fetch blocks `w+1 ..= target` in height order, filtering each one.
//!    Any failed block abandons the whole range.
//! 4. Upsert the collected transactions, then move the watermark to `target`.

use std::sync::{Arc, RwLock};

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use chainsync_core::{
    BlockTag, ChainClient, SyncConfig, SyncError, SyncOutcome, SyncPhase, SyncStorage,
    Transaction, TransactionFilter, TransactionQuery, U256,
};

/// Keeps one account's transactions, balance and gas price in sync with a node.
pub struct SyncEngine {
    config: SyncConfig,
    client: Arc<dyn ChainClient>,
    storage: Arc<dyn SyncStorage>,
    filter: TransactionFilter,
    phase: RwLock<SyncPhase>,
    /// Held for the duration of a cycle (and of `clear`).
    cycle: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        client: Arc<dyn ChainClient>,
        storage: Arc<dyn SyncStorage>,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            filter: TransactionFilter::new(config.address.clone()),
            config,
            client,
            storage,
            phase: RwLock::new(SyncPhase::Idle),
            cycle: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The watched address.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Where the current (or last) cycle is.
    pub fn phase(&self) -> SyncPhase {
        self.phase
            .read()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_phase(&self, phase: SyncPhase) {
        match self.phase.write() {
            Ok(mut p) => *p = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
    }

    // ─── Sync ────────────────────────────────────────────────────────────────

    /// Run one sync cycle.
    ///
    /// Fails with [`SyncError::CycleInProgress`] if another cycle on this
    /// engine has not finished. On any error the watermark is unchanged.
    pub async fn run_sync_cycle(&self) -> Result<SyncOutcome, SyncError> {
        let _guard = self
            .cycle
            .try_lock()
            .map_err(|_| SyncError::CycleInProgress)?;

        match self.run_cycle().await {
            Ok(outcome) => {
                self.set_phase(SyncPhase::Idle);
                Ok(outcome)
            }
            Err(err) => {
                warn!(address = %self.config.address, error = %err, "sync cycle failed");
                self.set_phase(SyncPhase::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn run_cycle(&self) -> Result<SyncOutcome, SyncError> {
        let watermark = self
            .storage
            .sync_state()
            .await?
            .last_block_height
            .unwrap_or_else(|| self.config.initial_watermark());

        self.set_phase(SyncPhase::FetchingTip);
        let tip = self.client.fetch_chain_tip().await?;

        let Some((from, target)) = self.config.plan_range(watermark, tip) else {
            if tip < watermark {
                warn!(tip, watermark, "node tip is behind the stored watermark");
                return Ok(SyncOutcome::NodeBehind { tip, watermark });
            }
            debug!(height = watermark, "already at chain tip");
            return Ok(SyncOutcome::UpToDate { height: watermark });
        };

        self.set_phase(SyncPhase::FetchingBlocks { next: from, target });
        let transactions = self.fetch_range(from, target, tip).await?;

        self.set_phase(SyncPhase::Committing);
        self.storage.upsert(&transactions).await?;
        self.storage.set_last_block_height(target).await?;

        info!(
            address = %self.config.address,
            from,
            to = target,
            tip,
            transactions = transactions.len(),
            "sync cycle committed"
        );
        Ok(SyncOutcome::Synced {
            from,
            to: target,
            tip,
            transactions: transactions.len(),
        })
    }

    /// Fetch and filter `from ..= target`. Up to `fetch_concurrency` requests
    /// are in flight; blocks are consumed in height order.
    async fn fetch_range(
        &self,
        from: u64,
        target: u64,
        tip: u64,
    ) -> Result<Vec<Transaction>, SyncError> {
        let client = &self.client;
        let mut blocks = stream::iter(from..=target)
            .map(|height| async move { (height, client.fetch_block(height).await) })
            .buffered(self.config.fetch_concurrency);

        let mut collected = Vec::new();
        while let Some((height, result)) = blocks.next().await {
            let block = result.map_err(|source| SyncError::RangeAbandoned {
                height,
                source: Box::new(source),
            })?;

            let mut relevant = self.filter.filter(&block);
            for tx in &mut relevant {
                tx.confirmations = Some(tip - height + 1);
            }
            debug!(height, relevant = relevant.len(), "block scanned");
            collected.extend(relevant);

            if height < target {
                self.set_phase(SyncPhase::FetchingBlocks {
                    next: height + 1,
                    target,
                });
            }
        }
        Ok(collected)
    }

    /// Fetch the node's gas price and store it.
    pub async fn refresh_gas_price(&self) -> Result<U256, SyncError> {
        let price = self.client.fetch_gas_price().await?;
        self.storage.set_gas_price(price).await?;
        debug!(%price, "gas price refreshed");
        Ok(price)
    }

    /// Fetch the watched address's latest balance and store it.
    pub async fn refresh_balance(&self) -> Result<U256, SyncError> {
        let value = self
            .client
            .fetch_balance(&self.config.address, BlockTag::Latest)
            .await?;
        self.storage.set_balance(&self.config.address, value).await?;
        debug!(address = %self.config.address, %value, "balance refreshed");
        Ok(value)
    }

    // ─── Read API ────────────────────────────────────────────────────────────

    /// Highest fully committed block, or `None` before the first cycle.
    pub async fn last_block_height(&self) -> Result<Option<u64>, SyncError> {
        Ok(self.storage.sync_state().await?.last_block_height)
    }

    pub async fn gas_price(&self) -> Result<Option<U256>, SyncError> {
        Ok(self.storage.sync_state().await?.gas_price)
    }

    pub async fn balance(&self, address: &str) -> Result<Option<U256>, SyncError> {
        self.storage.balance(address).await
    }

    pub async fn transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, SyncError> {
        self.storage.transactions(query).await
    }

    pub async fn last_synced_block_height(
        &self,
        is_token: bool,
    ) -> Result<Option<u64>, SyncError> {
        self.storage.last_synced_block_height(is_token).await
    }

    // ─── Write API ───────────────────────────────────────────────────────────

    pub async fn set_balance(&self, address: &str, value: U256) -> Result<(), SyncError> {
        self.storage.set_balance(address, value).await
    }

    /// Delete all stored state. Waits for a running cycle to finish first.
    pub async fn clear(&self) -> Result<(), SyncError> {
        let _guard = self.cycle.lock().await;
        self.storage.clear().await?;
        self.set_phase(SyncPhase::Idle);
        info!(address = %self.config.address, "sync state cleared");
        Ok(())
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
