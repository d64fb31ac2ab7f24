//! In-memory storage backend.
//!
//! Stores transactions, balances and the sync-state row in RAM.
//! Useful for testing and short-lived engines that don't need persistence.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use chainsync_core::store::{
    contract_key, normalize_address, BalanceStore, SyncStorage, TransactionQuery, TransactionStore,
    WatermarkStore,
};
use chainsync_core::{SyncError, SyncState, Transaction, U256};

type TxKey = (String, String);

fn key(tx: &Transaction) -> TxKey {
    (tx.hash.clone(), contract_key(tx))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory account storage.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    transactions: Mutex<HashMap<TxKey, Transaction>>,
    balances: Mutex<HashMap<String, U256>>,
    state: Mutex<Option<SyncState>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored transaction rows.
    pub fn transaction_count(&self) -> usize {
        lock(&self.transactions).len()
    }

    fn replace_state(&self, update: impl FnOnce(&mut SyncState)) {
        let mut guard = lock(&self.state);
        let mut next = guard.clone().unwrap_or_default();
        update(&mut next);
        next.updated_at = Some(chrono::Utc::now().timestamp());
        *guard = Some(next);
    }
}

#[async_trait]
impl WatermarkStore for InMemoryStorage {
    async fn sync_state(&self) -> Result<SyncState, SyncError> {
        Ok(lock(&self.state).clone().unwrap_or_default())
    }

    async fn set_last_block_height(&self, height: u64) -> Result<(), SyncError> {
        self.replace_state(|s| s.last_block_height = Some(height));
        Ok(())
    }

    async fn set_gas_price(&self, price: U256) -> Result<(), SyncError> {
        self.replace_state(|s| s.gas_price = Some(price));
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for InMemoryStorage {
    async fn upsert(&self, transactions: &[Transaction]) -> Result<(), SyncError> {
        let mut rows = lock(&self.transactions);
        for tx in transactions {
            let mut row = tx.clone();
            row.contract_address = row.contract_address.as_deref().map(normalize_address);
            rows.insert(key(tx), row);
        }
        Ok(())
    }

    async fn transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, SyncError> {
        Ok(query.apply(lock(&self.transactions).values()))
    }

    async fn last_synced_block_height(&self, is_token: bool) -> Result<Option<u64>, SyncError> {
        Ok(lock(&self.transactions)
            .values()
            .filter(|t| t.contract_address.is_some() == is_token)
            .filter_map(|t| t.block_number)
            .max())
    }
}

#[async_trait]
impl BalanceStore for InMemoryStorage {
    async fn set_balance(&self, address: &str, value: U256) -> Result<(), SyncError> {
        lock(&self.balances).insert(normalize_address(address), value);
        Ok(())
    }

    async fn balance(&self, address: &str) -> Result<Option<U256>, SyncError> {
        Ok(lock(&self.balances).get(&normalize_address(address)).copied())
    }
}

#[async_trait]
impl SyncStorage for InMemoryStorage {
    async fn clear(&self) -> Result<(), SyncError> {
        let mut transactions = lock(&self.transactions);
        let mut balances = lock(&self.balances);
        let mut state = lock(&self.state);
        transactions.clear();
        balances.clear();
        *state = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(hash: &str, block: u64, contract: Option<&str>) -> Transaction {
        Transaction {
            hash: hash.into(),
            nonce: block,
            input: vec![],
            from: "0x1111111111111111111111111111111111111111".into(),
            to: Some("0x2222222222222222222222222222222222222222".into()),
            value: U256::from(block),
            gas_limit: 21_000,
            gas_price: 1_000_000_000,
            timestamp: 1_700_000_000,
            contract_address: contract.map(Into::into),
            block_hash: Some(format!("0x{block:064x}")),
            block_number: Some(block),
            confirmations: Some(1),
            gas_used: None,
            cumulative_gas_used: None,
            is_error: None,
            transaction_index: 0,
            receipt_status: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_on_conflict() {
        let store = InMemoryStorage::new();
        store.upsert(&[tx("0xa", 100, None)]).await.unwrap();

        let mut newer = tx("0xa", 100, None);
        newer.confirmations = Some(12);
        newer.is_error = Some(false);
        store.upsert(&[newer.clone()]).await.unwrap();

        assert_eq!(store.transaction_count(), 1);
        let rows = store.transactions(&TransactionQuery::new()).await.unwrap();
        assert_eq!(rows, vec![newer]);
    }

    #[tokio::test]
    async fn same_hash_native_and_token_are_distinct() {
        let store = InMemoryStorage::new();
        store
            .upsert(&[tx("0xa", 100, None), tx("0xa", 100, Some("0xtoken"))])
            .await
            .unwrap();
        assert_eq!(store.transaction_count(), 2);
    }

    #[tokio::test]
    async fn contract_address_is_case_insensitive() {
        let store = InMemoryStorage::new();
        store
            .upsert(&[tx("0xa", 100, Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"))])
            .await
            .unwrap();
        store
            .upsert(&[tx("0xa", 100, Some("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"))])
            .await
            .unwrap();
        assert_eq!(store.transaction_count(), 1);

        let rows = store
            .transactions(
                &TransactionQuery::new().contract("0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].contract_address.as_deref(),
            Some("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
        );
    }

    #[tokio::test]
    async fn pages_through_native_and_token_rows_with_one_hash() {
        let store = InMemoryStorage::new();
        store
            .upsert(&[tx("0x1", 5, None), tx("0x1", 5, Some("0xtoken")), tx("0x0", 4, None)])
            .await
            .unwrap();

        let first = store.transactions(&TransactionQuery::new().limit(1)).await.unwrap();
        let second = store
            .transactions(&TransactionQuery::new().limit(1).after_row(&first[0]))
            .await
            .unwrap();
        let third = store
            .transactions(&TransactionQuery::new().limit(1).after_row(&second[0]))
            .await
            .unwrap();
        let done = store
            .transactions(&TransactionQuery::new().limit(1).after_row(&third[0]))
            .await
            .unwrap();

        assert_eq!(first[0].contract_address.as_deref(), Some("0xtoken"));
        assert_eq!((second[0].hash.as_str(), second[0].contract_address.as_deref()), ("0x1", None));
        assert_eq!(third[0].hash, "0x0");
        assert!(done.is_empty());
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = InMemoryStorage::new();
        let batch = vec![tx("0xa", 101, None), tx("0xb", 102, None)];
        store.upsert(&batch).await.unwrap();
        let first = store.transactions(&TransactionQuery::new()).await.unwrap();
        store.upsert(&batch).await.unwrap();
        let second = store.transactions(&TransactionQuery::new()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.transaction_count(), 2);
    }

    #[tokio::test]
    async fn per_category_heights() {
        let store = InMemoryStorage::new();
        assert_eq!(store.last_synced_block_height(false).await.unwrap(), None);
        store
            .upsert(&[
                tx("0xa", 100, None),
                tx("0xb", 105, None),
                tx("0xc", 103, Some("0xtoken")),
            ])
            .await
            .unwrap();
        assert_eq!(store.last_synced_block_height(false).await.unwrap(), Some(105));
        assert_eq!(store.last_synced_block_height(true).await.unwrap(), Some(103));
    }

    #[tokio::test]
    async fn sync_state_read_modify_replace() {
        let store = InMemoryStorage::new();
        assert_eq!(store.sync_state().await.unwrap(), SyncState::default());

        store.set_gas_price(U256::from(7u64)).await.unwrap();
        store.set_last_block_height(100).await.unwrap();
        let state = store.sync_state().await.unwrap();
        assert_eq!(state.last_block_height, Some(100));
        assert_eq!(state.gas_price, Some(U256::from(7u64)));
        assert!(state.updated_at.is_some());
    }

    #[tokio::test]
    async fn balance_is_per_address_and_case_insensitive() {
        let store = InMemoryStorage::new();
        store.set_balance("0xABC", U256::from(5u64)).await.unwrap();
        store.set_balance("0xabc", U256::from(9u64)).await.unwrap();
        assert_eq!(store.balance("0xAbC").await.unwrap(), Some(U256::from(9u64)));
        assert_eq!(store.balance("0xdef").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_empties_everything() {
        let store = InMemoryStorage::new();
        store.upsert(&[tx("0xa", 100, None)]).await.unwrap();
        store.set_balance("0xabc", U256::from(1u64)).await.unwrap();
        store.set_last_block_height(100).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.transaction_count(), 0);
        assert_eq!(store.balance("0xabc").await.unwrap(), None);
        assert_eq!(store.sync_state().await.unwrap().last_block_height, None);
    }
}
