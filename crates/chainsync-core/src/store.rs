//! Storage traits for sync state, transactions and balances.
//!
//! Implementations live in `chainsync-storage` (`InMemoryStorage`,
//! `SqliteStorage`).

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::types::{SyncState, Transaction};

/// Reads and replaces the singleton sync-state row.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Load the sync state, or the all-`None` default if no row exists.
    async fn sync_state(&self) -> Result<SyncState, SyncError>;

    /// Replace the row with `last_block_height = height`, keeping the gas price.
    async fn set_last_block_height(&self, height: u64) -> Result<(), SyncError>;

    /// Replace the row with `gas_price = price`, keeping the watermark.
    async fn set_gas_price(&self, price: U256) -> Result<(), SyncError>;
}

/// Replace-on-conflict transaction storage keyed by `(hash, contract_address)`.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert all of `transactions` in one atomic batch. A row sharing
    /// `(hash, contract_address)` with an existing one replaces it entirely.
    async fn upsert(&self, transactions: &[Transaction]) -> Result<(), SyncError>;

    /// Paginated read, newest first. See [`TransactionQuery`].
    async fn transactions(&self, query: &TransactionQuery)
        -> Result<Vec<Transaction>, SyncError>;

    /// Highest stored block number among native (`is_token == false`) or
    /// token (`is_token == true`) transactions.
    async fn last_synced_block_height(&self, is_token: bool) -> Result<Option<u64>, SyncError>;
}

/// One balance row per address.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn set_balance(&self, address: &str, value: U256) -> Result<(), SyncError>;

    async fn balance(&self, address: &str) -> Result<Option<U256>, SyncError>;
}

/// Everything the sync engine needs from a backend.
#[async_trait]
pub trait SyncStorage: WatermarkStore + TransactionStore + BalanceStore {
    /// Delete every transaction, balance and sync-state row atomically.
    async fn clear(&self) -> Result<(), SyncError>;
}

/// Filter and cursor for [`TransactionStore::transactions`].
///
/// Rows are ordered descending by `(block_number, transaction_index, hash,
/// contract_address)`; unmined rows come first. The cursor is a full row
/// identity: `after_hash` plus `after_contract` (falling back to the
/// `contract_address` filter, then to the native row). Paging resumes
/// strictly after that row; an unknown cursor yields an empty page.
///
/// Contract addresses compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub after_hash: Option<String>,
    /// Token contract of the cursor row; `None` means the native row.
    pub after_contract: Option<String>,
    pub limit: Option<u32>,
    /// Restrict to one token contract; `None` returns every row.
    pub contract_address: Option<String>,
}

impl TransactionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after the row with this hash (the native row, unless a
    /// contract filter or [`after_contract`](Self::after_contract) says otherwise).
    pub fn after(mut self, hash: impl Into<String>) -> Self {
        self.after_hash = Some(hash.into());
        self
    }

    /// Resume after the token row `(hash, contract)`.
    pub fn after_token(mut self, hash: impl Into<String>, contract: &str) -> Self {
        self.after_hash = Some(hash.into());
        self.after_contract = Some(normalize_address(contract));
        self
    }

    pub fn after_contract(mut self, contract: &str) -> Self {
        self.after_contract = Some(normalize_address(contract));
        self
    }

    /// Resume after `row`, typically the last one of the previous page.
    pub fn after_row(mut self, row: &Transaction) -> Self {
        self.after_hash = Some(row.hash.clone());
        self.after_contract = row.contract_address.as_deref().map(normalize_address);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn contract(mut self, address: &str) -> Self {
        self.contract_address = Some(normalize_address(address));
        self
    }

    /// Normalized contract filter.
    pub fn contract_key(&self) -> Option<String> {
        self.contract_address.as_deref().map(normalize_address)
    }

    /// Cursor identity as `(hash, contract key)`, where native rows use `""`.
    pub fn cursor(&self) -> Option<(&str, String)> {
        let hash = self.after_hash.as_deref()?;
        let contract = self
            .after_contract
            .as_deref()
            .or(self.contract_address.as_deref())
            .map(normalize_address)
            .unwrap_or_default();
        Some((hash, contract))
    }

    /// Apply this query to an unordered set of rows. Backends without a query
    /// engine (the in-memory store) use this directly.
    pub fn apply<'a, I>(&self, rows: I) -> Vec<Transaction>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let filter = self.contract_key();
        let mut rows: Vec<&Transaction> = rows
            .into_iter()
            .filter(|t| match &filter {
                Some(c) => contract_key(t) == *c,
                None => true,
            })
            .collect();
        rows.sort_by(|a, b| b.page_key().cmp(&a.page_key()));

        let start = match self.cursor() {
            Some((hash, contract)) => {
                match rows
                    .iter()
                    .position(|t| t.hash == hash && contract_key(t) == contract)
                {
                    Some(pos) => pos + 1,
                    None => return Vec::new(),
                }
            }
            None => 0,
        };
        let limit = self.limit.map_or(usize::MAX, |l| l as usize);
        rows.into_iter().skip(start).take(limit).cloned().collect()
    }
}

/// Storage key for a row's contract: lowercase, `""` for native transfers.
pub fn contract_key(tx: &Transaction) -> String {
    tx.contract_address
        .as_deref()
        .map(normalize_address)
        .unwrap_or_default()
}

/// Lowercase key used for balance rows and contract addresses.
pub fn normalize_address(address: &str) -> String {
    address.to_ascii_lowercase()
}
