//! Shared types for the sync pipeline.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

// ─── Transaction ──────────────────────────────────────────────────────────────

/// A normalized account transaction.
///
/// Identity is `(hash, contract_address)`: the same hash may be stored once as
/// a native transfer (`contract_address == None`) and once per token transfer
/// it triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash (`0x…`).
    pub hash: String,
    pub nonce: u64,
    /// Call data.
    #[serde(with = "serde_hex_bytes")]
    pub input: Vec<u8>,
    pub from: String,
    /// `None` for contract creation.
    pub to: Option<String>,
    /// Transferred amount in wei (or token base units).
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u64,
    /// Block timestamp, seconds since epoch.
    pub timestamp: u64,
    /// `None` = native-asset transfer.
    pub contract_address: Option<String>,
    pub block_hash: Option<String>,
    pub block_number: Option<u64>,
    pub confirmations: Option<u64>,
    pub gas_used: Option<u64>,
    pub cumulative_gas_used: Option<u64>,
    /// Tri-state: `None` = unknown.
    pub is_error: Option<bool>,
    pub transaction_index: u64,
    pub receipt_status: Option<u64>,
}

impl Transaction {
    /// Returns `true` for native-asset transfers.
    pub fn is_native(&self) -> bool {
        self.contract_address.is_none()
    }

    /// Sort key for paginated reads. Unmined rows sort as the newest.
    pub fn page_key(&self) -> (u64, u64, &str, &str) {
        (
            self.block_number.unwrap_or(u64::MAX),
            self.transaction_index,
            self.hash.as_str(),
            self.contract_address.as_deref().unwrap_or(""),
        )
    }
}

mod serde_hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::hex::encode_bytes(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        crate::hex::decode_bytes(&s).map_err(serde::de::Error::custom)
    }
}

// ─── Balance ──────────────────────────────────────────────────────────────────

/// The latest known balance of an address. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: String,
    pub value: U256,
}

// ─── SyncState ────────────────────────────────────────────────────────────────

/// The singleton sync watermark row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Highest block fully synced and committed.
    pub last_block_height: Option<u64>,
    /// Last gas price reported by the node, in wei.
    pub gas_price: Option<U256>,
    /// Unix timestamp of the last replace (`None` if never written).
    pub updated_at: Option<i64>,
}

// ─── Block ────────────────────────────────────────────────────────────────────

/// A block as returned by `eth_getBlockByNumber(.., true)`.
///
/// The block header fields are decoded up front; transactions stay in wire
/// form until the filter normalizes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    pub hash: Option<String>,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Transactions in block order.
    pub transactions: Vec<RawTransaction>,
}

/// A transaction object in wire form. Every field is optional so that one
/// malformed entry can be skipped without rejecting the whole block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTransaction {
    pub hash: Option<String>,
    pub nonce: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    pub gas: Option<String>,
    pub gas_price: Option<String>,
    pub max_fee_per_gas: Option<String>,
    pub input: Option<String>,
    pub transaction_index: Option<String>,
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
}
