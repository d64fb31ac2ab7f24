//! SQLite storage backend for ChainSync.
//!
//! Persists transactions, balances and the sync-state row to a single SQLite
//! file. Uses `sqlx` with WAL mode for concurrent read performance.
//!
//! # Usage
//! ```rust,no_run
//! use chainsync_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./wallet.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use chainsync_core::store::{
    contract_key, normalize_address, BalanceStore, SyncStorage, TransactionQuery, TransactionStore,
    WatermarkStore,
};
use chainsync_core::{SyncError, SyncState, Transaction, U256};

/// Sort position of a row: unmined rows (NULL block) sort as the newest.
const POSITION: &str = "COALESCE(block_number, 9223372036854775807)";

const TX_COLUMNS: &str = "hash, contract_address, nonce, input, from_address, to_address, value,
     gas_limit, gas_price, timestamp, block_hash, block_number, confirmations, gas_used,
     cumulative_gas_used, is_error, transaction_index, receipt_status";

/// SQLite-backed storage for transactions, balances and sync state.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./wallet.db"`) or a full
    /// SQLite URL (`"sqlite:./wallet.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, SyncError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(SyncError::storage)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// The database lives only as long as its one connection, so the pool
    /// holds exactly one and never retires it. All data is lost when the
    /// pool is dropped.
    pub async fn in_memory() -> Result<Self, SyncError> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(SyncError::storage)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create tables and enable WAL mode.
    async fn init_schema(&self) -> Result<(), SyncError> {
        let statements = [
            "PRAGMA journal_mode=WAL;",
            // Native transfers use '' as contract_address so the composite key
            // collides (NULLs never do in SQLite).
            "CREATE TABLE IF NOT EXISTS transactions (
                hash                TEXT    NOT NULL,
                contract_address    TEXT    NOT NULL DEFAULT '',
                nonce               INTEGER NOT NULL,
                input               BLOB    NOT NULL,
                from_address        TEXT    NOT NULL,
                to_address          TEXT,
                value               TEXT    NOT NULL,
                gas_limit           INTEGER NOT NULL,
                gas_price           INTEGER NOT NULL,
                timestamp           INTEGER NOT NULL,
                block_hash          TEXT,
                block_number        INTEGER,
                confirmations       INTEGER,
                gas_used            INTEGER,
                cumulative_gas_used INTEGER,
                is_error            INTEGER,
                transaction_index   INTEGER NOT NULL,
                receipt_status      INTEGER,
                PRIMARY KEY (hash, contract_address)
            );",
            "CREATE INDEX IF NOT EXISTS idx_transactions_position
                ON transactions (block_number, transaction_index);",
            "CREATE TABLE IF NOT EXISTS balances (
                address TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            );",
            "CREATE TABLE IF NOT EXISTS sync_state (
                id                INTEGER PRIMARY KEY CHECK (id = 1),
                last_block_height INTEGER,
                gas_price         TEXT,
                updated_at        INTEGER NOT NULL
            );",
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(SyncError::storage)?;
        }
        Ok(())
    }

    /// Access the underlying connection pool (e.g. for custom queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Total number of stored transaction rows.
    pub async fn transaction_count(&self) -> Result<u64, SyncError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(SyncError::storage)?;
        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }

    // ─── Sync state ──────────────────────────────────────────────────────────

    async fn load_state(conn: &mut SqliteConnection) -> Result<SyncState, SyncError> {
        let row = sqlx::query(
            "SELECT last_block_height, gas_price, updated_at FROM sync_state WHERE id = 1",
        )
        .fetch_optional(&mut *conn)
        .await
        .map_err(SyncError::storage)?;

        let Some(row) = row else {
            return Ok(SyncState::default());
        };
        let gas_price: Option<String> = row.try_get("gas_price").map_err(SyncError::storage)?;
        Ok(SyncState {
            last_block_height: row
                .try_get::<Option<i64>, _>("last_block_height")
                .map_err(SyncError::storage)?
                .map(|h| h as u64),
            gas_price: gas_price.as_deref().map(parse_u256).transpose()?,
            updated_at: Some(row.try_get("updated_at").map_err(SyncError::storage)?),
        })
    }

    /// Read the row, apply `update`, write it back, all in one transaction.
    async fn replace_state(
        &self,
        update: impl FnOnce(&mut SyncState) + Send,
    ) -> Result<(), SyncError> {
        let mut tx = self.pool.begin().await.map_err(SyncError::storage)?;
        let mut state = Self::load_state(&mut tx).await?;
        update(&mut state);

        sqlx::query(
            "INSERT OR REPLACE INTO sync_state (id, last_block_height, gas_price, updated_at)
             VALUES (1, ?, ?, ?)",
        )
        .bind(state.last_block_height.map(|h| h as i64))
        .bind(state.gas_price.map(|p| p.to_string()))
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .map_err(SyncError::storage)?;

        tx.commit().await.map_err(SyncError::storage)?;
        debug!(
            last_block_height = ?state.last_block_height,
            gas_price = ?state.gas_price,
            "sync state replaced"
        );
        Ok(())
    }

    // ─── Transactions ────────────────────────────────────────────────────────

    /// Sort position of the row `(hash, contract)`.
    async fn anchor(
        &self,
        hash: &str,
        contract: &str,
    ) -> Result<Option<(i64, i64, String, String)>, SyncError> {
        let row = sqlx::query(&format!(
            "SELECT {POSITION} AS pos, transaction_index, hash, contract_address
             FROM transactions WHERE hash = ? AND contract_address = ?"
        ))
        .bind(hash)
        .bind(contract)
        .fetch_optional(&self.pool)
        .await
        .map_err(SyncError::storage)?;

        row.map(|r| -> Result<_, sqlx::Error> {
            Ok((
                r.try_get("pos")?,
                r.try_get("transaction_index")?,
                r.try_get("hash")?,
                r.try_get("contract_address")?,
            ))
        })
        .transpose()
        .map_err(SyncError::storage)
    }
}

fn parse_u256(s: &str) -> Result<U256, SyncError> {
    U256::from_str_radix(s, 10)
        .map_err(|e| SyncError::Storage(format!("stored amount {s:?} is not a decimal integer: {e}")))
}

fn opt_u64(row: &SqliteRow, column: &str) -> Result<Option<u64>, sqlx::Error> {
    Ok(row.try_get::<Option<i64>, _>(column)?.map(|v| v as u64))
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction, SyncError> {
    let contract: String = row.try_get("contract_address").map_err(SyncError::storage)?;
    let value: String = row.try_get("value").map_err(SyncError::storage)?;

    let decode = || -> Result<Transaction, sqlx::Error> {
        Ok(Transaction {
            hash: row.try_get("hash")?,
            nonce: row.try_get::<i64, _>("nonce")? as u64,
            input: row.try_get("input")?,
            from: row.try_get("from_address")?,
            to: row.try_get("to_address")?,
            value: U256::ZERO,
            gas_limit: row.try_get::<i64, _>("gas_limit")? as u64,
            gas_price: row.try_get::<i64, _>("gas_price")? as u64,
            timestamp: row.try_get::<i64, _>("timestamp")? as u64,
            contract_address: None,
            block_hash: row.try_get("block_hash")?,
            block_number: opt_u64(row, "block_number")?,
            confirmations: opt_u64(row, "confirmations")?,
            gas_used: opt_u64(row, "gas_used")?,
            cumulative_gas_used: opt_u64(row, "cumulative_gas_used")?,
            is_error: row.try_get("is_error")?,
            transaction_index: row.try_get::<i64, _>("transaction_index")? as u64,
            receipt_status: opt_u64(row, "receipt_status")?,
        })
    };

    let mut tx = decode().map_err(SyncError::storage)?;
    tx.value = parse_u256(&value)?;
    tx.contract_address = (!contract.is_empty()).then_some(contract);
    Ok(tx)
}

// ─── WatermarkStore impl ─────────────────────────────────────────────────────

#[async_trait]
impl WatermarkStore for SqliteStorage {
    async fn sync_state(&self) -> Result<SyncState, SyncError> {
        let mut conn = self.pool.acquire().await.map_err(SyncError::storage)?;
        Self::load_state(&mut conn).await
    }

    async fn set_last_block_height(&self, height: u64) -> Result<(), SyncError> {
        self.replace_state(|s| s.last_block_height = Some(height)).await
    }

    async fn set_gas_price(&self, price: U256) -> Result<(), SyncError> {
        self.replace_state(|s| s.gas_price = Some(price)).await
    }
}

// ─── TransactionStore impl ───────────────────────────────────────────────────

#[async_trait]
impl TransactionStore for SqliteStorage {
    async fn upsert(&self, transactions: &[Transaction]) -> Result<(), SyncError> {
        if transactions.is_empty() {
            return Ok(());
        }

        let mut db = self.pool.begin().await.map_err(SyncError::storage)?;
        let sql = format!(
            "INSERT OR REPLACE INTO transactions ({TX_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        for t in transactions {
            sqlx::query(&sql)
                .bind(&t.hash)
                .bind(contract_key(t))
                .bind(t.nonce as i64)
                .bind(&t.input)
                .bind(&t.from)
                .bind(&t.to)
                .bind(t.value.to_string())
                .bind(t.gas_limit as i64)
                .bind(t.gas_price as i64)
                .bind(t.timestamp as i64)
                .bind(&t.block_hash)
                .bind(t.block_number.map(|n| n as i64))
                .bind(t.confirmations.map(|n| n as i64))
                .bind(t.gas_used.map(|n| n as i64))
                .bind(t.cumulative_gas_used.map(|n| n as i64))
                .bind(t.is_error)
                .bind(t.transaction_index as i64)
                .bind(t.receipt_status.map(|n| n as i64))
                .execute(&mut *db)
                .await
                .map_err(SyncError::storage)?;
        }
        db.commit().await.map_err(SyncError::storage)?;

        debug!(count = transactions.len(), "transactions upserted");
        Ok(())
    }

    async fn transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, SyncError> {
        let filter = query.contract_key();

        let anchor = match query.cursor() {
            Some((_, cursor_contract))
                if filter.as_ref().is_some_and(|c| *c != cursor_contract) =>
            {
                return Ok(Vec::new());
            }
            Some((hash, cursor_contract)) => match self.anchor(hash, &cursor_contract).await? {
                Some(a) => Some(a),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE 1 = 1"
        ));
        if let Some(c) = filter {
            qb.push(" AND contract_address = ").push_bind(c);
        }
        if let Some((pos, index, hash, contract)) = anchor {
            qb.push(format!(
                " AND ({POSITION}, transaction_index, hash, contract_address) < ("
            ));
            qb.push_bind(pos)
                .push(", ")
                .push_bind(index)
                .push(", ")
                .push_bind(hash)
                .push(", ")
                .push_bind(contract)
                .push(")");
        }
        qb.push(format!(
            " ORDER BY {POSITION} DESC, transaction_index DESC, hash DESC, contract_address DESC"
        ));
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(SyncError::storage)?;
        rows.iter().map(row_to_transaction).collect()
    }

    async fn last_synced_block_height(&self, is_token: bool) -> Result<Option<u64>, SyncError> {
        let sql = if is_token {
            "SELECT MAX(block_number) AS h FROM transactions WHERE contract_address <> ''"
        } else {
            "SELECT MAX(block_number) AS h FROM transactions WHERE contract_address = ''"
        };
        let row = sqlx::query(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(SyncError::storage)?;
        opt_u64(&row, "h").map_err(SyncError::storage)
    }
}

// ─── BalanceStore impl ───────────────────────────────────────────────────────

#[async_trait]
impl BalanceStore for SqliteStorage {
    async fn set_balance(&self, address: &str, value: U256) -> Result<(), SyncError> {
        sqlx::query("INSERT OR REPLACE INTO balances (address, value) VALUES (?, ?)")
            .bind(normalize_address(address))
            .bind(value.to_string())
            .execute(&self.pool)
            .await
            .map_err(SyncError::storage)?;
        debug!(address, %value, "balance replaced");
        Ok(())
    }

    async fn balance(&self, address: &str) -> Result<Option<U256>, SyncError> {
        let row = sqlx::query("SELECT value FROM balances WHERE address = ?")
            .bind(normalize_address(address))
            .fetch_optional(&self.pool)
            .await
            .map_err(SyncError::storage)?;

        match row {
            Some(r) => {
                let value: String = r.try_get("value").map_err(SyncError::storage)?;
                parse_u256(&value).map(Some)
            }
            None => Ok(None),
        }
    }
}

// ─── SyncStorage impl ────────────────────────────────────────────────────────

#[async_trait]
impl SyncStorage for SqliteStorage {
    async fn clear(&self) -> Result<(), SyncError> {
        let mut db = self.pool.begin().await.map_err(SyncError::storage)?;
        for table in ["transactions", "balances", "sync_state"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *db)
                .await
                .map_err(SyncError::storage)?;
        }
        db.commit().await.map_err(SyncError::storage)?;
        debug!("storage cleared");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn sample_tx(hash: &str, block: Option<u64>, index: u64) -> Transaction {
        Transaction {
            hash: hash.into(),
            nonce: 42,
            input: vec![0xa9, 0x05, 0x9c, 0xbb],
            from: "0x1111111111111111111111111111111111111111".into(),
            to: Some("0x2222222222222222222222222222222222222222".into()),
            // 100 ETH, wider than u64
            value: U256::from_str_radix("100000000000000000000", 10).unwrap(),
            gas_limit: 21_000,
            gas_price: 30_000_000_000,
            timestamp: 1_700_000_000,
            contract_address: None,
            block_hash: block.map(|b| format!("0x{b:064x}")),
            block_number: block,
            confirmations: block.map(|_| 1),
            gas_used: None,
            cumulative_gas_used: None,
            is_error: None,
            transaction_index: index,
            receipt_status: None,
        }
    }

    fn hashes(rows: &[Transaction]) -> Vec<&str> {
        rows.iter().map(|t| t.hash.as_str()).collect()
    }

    // ── Transactions ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn transaction_roundtrip() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let mut t = sample_tx("0xa", Some(100), 3);
        t.is_error = Some(true);
        t.gas_used = Some(21_000);
        store.upsert(&[t.clone()]).await.unwrap();

        let rows = store.transactions(&TransactionQuery::new()).await.unwrap();
        assert_eq!(rows, vec![t]);
    }

    #[tokio::test]
    async fn upsert_replaces_whole_row() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store.upsert(&[sample_tx("0xa", Some(100), 0)]).await.unwrap();

        let mut refreshed = sample_tx("0xa", Some(100), 0);
        refreshed.confirmations = Some(12);
        refreshed.is_error = Some(false);
        store.upsert(&[refreshed.clone()]).await.unwrap();

        assert_eq!(store.transaction_count().await.unwrap(), 1);
        let rows = store.transactions(&TransactionQuery::new()).await.unwrap();
        assert_eq!(rows[0].confirmations, Some(12));
        assert_eq!(rows[0].is_error, Some(false));
    }

    #[tokio::test]
    async fn native_and_token_rows_share_hash() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let native = sample_tx("0xa", Some(100), 0);
        let mut token = sample_tx("0xa", Some(100), 0);
        token.contract_address = Some(TOKEN.into());
        store.upsert(&[native, token]).await.unwrap();
        // Upserting the native row again must not duplicate it.
        store.upsert(&[sample_tx("0xa", Some(100), 0)]).await.unwrap();

        assert_eq!(store.transaction_count().await.unwrap(), 2);
        let only_token = store
            .transactions(&TransactionQuery::new().contract(TOKEN))
            .await
            .unwrap();
        assert_eq!(only_token.len(), 1);
        assert_eq!(
            only_token[0].contract_address.as_deref(),
            Some(TOKEN.to_ascii_lowercase().as_str())
        );
    }

    #[tokio::test]
    async fn contract_filter_ignores_case() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let mut mixed = sample_tx("0xa", Some(100), 0);
        mixed.contract_address = Some(TOKEN.into());
        let mut lower = sample_tx("0xa", Some(100), 0);
        lower.contract_address = Some(TOKEN.to_ascii_lowercase());
        store.upsert(&[mixed]).await.unwrap();
        store.upsert(&[lower]).await.unwrap();
        assert_eq!(store.transaction_count().await.unwrap(), 1);

        let upper = TOKEN.to_ascii_uppercase().replacen("0X", "0x", 1);
        let rows = store
            .transactions(&TransactionQuery::new().contract(&upper))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn pages_through_rows_sharing_a_hash() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let mut token = sample_tx("0x1", Some(5), 0);
        token.contract_address = Some(TOKEN.into());
        store
            .upsert(&[sample_tx("0x1", Some(5), 0), token, sample_tx("0x0", Some(4), 0)])
            .await
            .unwrap();

        let mut seen = Vec::new();
        let mut query = TransactionQuery::new().limit(1);
        loop {
            let page = store.transactions(&query).await.unwrap();
            let Some(last) = page.last() else { break };
            seen.push((last.hash.clone(), last.contract_address.clone()));
            assert!(seen.len() <= 3, "pagination loops: {seen:?}");
            query = TransactionQuery::new().limit(1).after_row(last);
        }
        assert_eq!(
            seen,
            vec![
                ("0x1".to_string(), Some(TOKEN.to_ascii_lowercase())),
                ("0x1".to_string(), None),
                ("0x0".to_string(), None),
            ]
        );

        // Within a contract filter the hash alone is enough.
        let filtered = store
            .transactions(&TransactionQuery::new().contract(TOKEN).after("0x1"))
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn failed_batch_rolls_back_every_row() {
        let store = SqliteStorage::in_memory().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_second BEFORE INSERT ON transactions
             WHEN NEW.hash = '0x2'
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store
            .upsert(&[
                sample_tx("0x1", Some(100), 0),
                sample_tx("0x2", Some(100), 1),
                sample_tx("0x3", Some(100), 2),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)), "{err:?}");
        assert_eq!(store.transaction_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn in_memory_pool_keeps_its_connection() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let options = store.pool().options();
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);

        store.upsert(&[sample_tx("0xa", Some(1), 0)]).await.unwrap();
        store.set_last_block_height(1).await.unwrap();
        assert_eq!(store.transaction_count().await.unwrap(), 1);
        assert_eq!(store.sync_state().await.unwrap().last_block_height, Some(1));
    }

    #[tokio::test]
    async fn pagination_is_newest_first() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store
            .upsert(&[
                sample_tx("0x1", Some(100), 0),
                sample_tx("0x2", Some(101), 5),
                sample_tx("0x3", Some(101), 1),
                sample_tx("0x4", None, 0),
                sample_tx("0x5", Some(99), 7),
            ])
            .await
            .unwrap();

        let all = store.transactions(&TransactionQuery::new()).await.unwrap();
        assert_eq!(hashes(&all), vec!["0x4", "0x2", "0x3", "0x1", "0x5"]);

        let page1 = store
            .transactions(&TransactionQuery::new().limit(2))
            .await
            .unwrap();
        assert_eq!(hashes(&page1), vec!["0x4", "0x2"]);

        let page2 = store
            .transactions(&TransactionQuery::new().after("0x2").limit(2))
            .await
            .unwrap();
        assert_eq!(hashes(&page2), vec!["0x3", "0x1"]);

        let page3 = store
            .transactions(&TransactionQuery::new().after("0x1").limit(2))
            .await
            .unwrap();
        assert_eq!(hashes(&page3), vec!["0x5"]);

        let unknown = store
            .transactions(&TransactionQuery::new().after("0xdead"))
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn per_category_block_heights() {
        let store = SqliteStorage::in_memory().await.unwrap();
        assert_eq!(store.last_synced_block_height(false).await.unwrap(), None);
        assert_eq!(store.last_synced_block_height(true).await.unwrap(), None);

        let mut token = sample_tx("0xt", Some(150), 0);
        token.contract_address = Some(TOKEN.into());
        store
            .upsert(&[sample_tx("0xa", Some(120), 0), sample_tx("0xb", Some(130), 0), token])
            .await
            .unwrap();

        assert_eq!(store.last_synced_block_height(false).await.unwrap(), Some(130));
        assert_eq!(store.last_synced_block_height(true).await.unwrap(), Some(150));
    }

    // ── Sync state ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn sync_state_defaults_when_missing() {
        let store = SqliteStorage::in_memory().await.unwrap();
        assert_eq!(store.sync_state().await.unwrap(), SyncState::default());
    }

    #[tokio::test]
    async fn sync_state_fields_are_replaced_independently() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store.set_last_block_height(100).await.unwrap();
        store
            .set_gas_price(U256::from(25_000_000_000u64))
            .await
            .unwrap();
        store.set_last_block_height(102).await.unwrap();

        let state = store.sync_state().await.unwrap();
        assert_eq!(state.last_block_height, Some(102));
        assert_eq!(state.gas_price, Some(U256::from(25_000_000_000u64)));
        assert!(state.updated_at.is_some());
    }

    // ── Balances ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn balance_replaced_wholesale() {
        let store = SqliteStorage::in_memory().await.unwrap();
        let addr = "0x1111111111111111111111111111111111111111";
        store.set_balance(addr, U256::from(10u64)).await.unwrap();
        store
            .set_balance(&addr.to_uppercase().replacen("0X", "0x", 1), U256::from(3u64))
            .await
            .unwrap();
        assert_eq!(store.balance(addr).await.unwrap(), Some(U256::from(3u64)));
        assert_eq!(store.balance("0xdead").await.unwrap(), None);
    }

    // ── Reset ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn clear_empties_all_tables() {
        let store = SqliteStorage::in_memory().await.unwrap();
        store.upsert(&[sample_tx("0xa", Some(100), 0)]).await.unwrap();
        store.set_balance("0xabc", U256::from(1u64)).await.unwrap();
        store.set_last_block_height(100).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.transaction_count().await.unwrap(), 0);
        assert_eq!(store.balance("0xabc").await.unwrap(), None);
        assert_eq!(store.sync_state().await.unwrap().last_block_height, None);
    }
}
