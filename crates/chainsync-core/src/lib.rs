//! chainsync-core — foundation for the single-account incremental sync engine.
//!
//! # Architecture
//!
//! ```text
//! SyncEngine (chainsync-engine)
//!     ├── ChainClient        (chain tip + full blocks over JSON-RPC)
//!     ├── TransactionFilter  (relevance test + hex normalization)
//!     ├── WatermarkStore     (last synced block, gas price)
//!     ├── TransactionStore   (replace-on-conflict by (hash, contract))
//!     └── BalanceStore       (one row per address)
//! ```

pub mod client;
pub mod error;
pub mod filter;
pub mod hex;
pub mod store;
pub mod sync;
pub mod types;

pub use client::ChainClient;
pub use error::SyncError;
pub use filter::TransactionFilter;
pub use hex::{BlockTag, HexError};
pub use store::{BalanceStore, SyncStorage, TransactionQuery, TransactionStore, WatermarkStore};
pub use sync::{SyncConfig, SyncOutcome, SyncPhase};
pub use types::{Balance, Block, RawTransaction, SyncState, Transaction};

/// Re-exported so downstream crates share one big-integer type.
pub use alloy_primitives::U256;
