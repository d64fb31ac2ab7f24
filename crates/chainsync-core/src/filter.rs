//! Relevance filter — selects the watched address's transactions from a block
//! and normalizes them into [`Transaction`] records.

use tracing::{debug, warn};

use crate::error::SyncError;
use crate::hex;
use crate::types::{Block, RawTransaction, Transaction};

/// Selects native transfers sent from or to one address.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    address: String,
}

impl TransactionFilter {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The watched address, as configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns `true` if `raw` is sent from or to the watched address.
    pub fn is_relevant(&self, raw: &RawTransaction) -> bool {
        let matches = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(&self.address))
        };
        matches(&raw.from) || matches(&raw.to)
    }

    /// Extract and normalize the relevant transactions of `block`, in block
    /// order. Transactions that fail to decode are skipped.
    pub fn filter(&self, block: &Block) -> Vec<Transaction> {
        let mut out = Vec::new();
        for (position, raw) in block.transactions.iter().enumerate() {
            if !self.is_relevant(raw) {
                continue;
            }
            match normalize(block, raw) {
                Ok(tx) => out.push(tx),
                Err(e) => {
                    warn!(
                        block = block.number,
                        position,
                        hash = raw.hash.as_deref().unwrap_or("<missing>"),
                        error = %e,
                        "skipping undecodable transaction"
                    );
                }
            }
        }
        debug!(
            block = block.number,
            total = block.transactions.len(),
            relevant = out.len(),
            "block filtered"
        );
        out
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, SyncError> {
    field
        .as_deref()
        .ok_or_else(|| SyncError::Decoding(format!("transaction field `{name}` is missing")))
}

/// Decode one wire transaction in the context of its block.
fn normalize(block: &Block, raw: &RawTransaction) -> Result<Transaction, SyncError> {
    let gas_price = raw
        .gas_price
        .as_ref()
        .or(raw.max_fee_per_gas.as_ref())
        .ok_or_else(|| SyncError::Decoding("transaction field `gasPrice` is missing".into()))?;

    Ok(Transaction {
        hash: required(&raw.hash, "hash")?.to_string(),
        nonce: hex::decode_int(required(&raw.nonce, "nonce")?)?,
        input: hex::decode_bytes(raw.input.as_deref().unwrap_or("0x"))?,
        from: required(&raw.from, "from")?.to_string(),
        to: raw.to.clone(),
        value: hex::decode_big(required(&raw.value, "value")?)?,
        gas_limit: hex::decode_int(required(&raw.gas, "gas")?)?,
        gas_price: hex::decode_int(gas_price)?,
        timestamp: block.timestamp,
        contract_address: None,
        block_hash: block.hash.clone().or_else(|| raw.block_hash.clone()),
        block_number: Some(block.number),
        confirmations: None,
        gas_used: None,
        cumulative_gas_used: None,
        is_error: None,
        transaction_index: hex::decode_int(required(&raw.transaction_index, "transactionIndex")?)?,
        receipt_status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCHED: &str = "0x1111111111111111111111111111111111111111";
    const OTHER: &str = "0x2222222222222222222222222222222222222222";
    const THIRD: &str = "0x3333333333333333333333333333333333333333";

    fn raw(hash: &str, from: &str, to: &str, index: u64) -> RawTransaction {
        RawTransaction {
            hash: Some(hash.into()),
            nonce: Some("0x5".into()),
            from: Some(from.into()),
            to: Some(to.into()),
            value: Some("0xde0b6b3a7640000".into()),
            gas: Some("0x5208".into()),
            gas_price: Some("0x3b9aca00".into()),
            input: Some("0x".into()),
            transaction_index: Some(hex::encode_int(index)),
            ..Default::default()
        }
    }

    fn block(transactions: Vec<RawTransaction>) -> Block {
        Block {
            number: 101,
            hash: Some("0xblock101".into()),
            timestamp: 0x6553f100,
            transactions,
        }
    }

    #[test]
    fn keeps_sender_and_recipient_in_order() {
        let b = block(vec![
            raw("0xa", WATCHED, OTHER, 0),
            raw("0xb", OTHER, THIRD, 1),
            raw("0xc", THIRD, WATCHED, 2),
        ]);
        let out = TransactionFilter::new(WATCHED).filter(&b);
        let hashes: Vec<_> = out.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xa", "0xc"]);
    }

    #[test]
    fn address_match_is_case_insensitive() {
        let upper = "0xABCDEFabcdef0000000000000000000000000000";
        let b = block(vec![raw("0xa", &upper.to_lowercase(), OTHER, 0)]);
        assert_eq!(TransactionFilter::new(upper).filter(&b).len(), 1);
    }

    #[test]
    fn normalizes_fields() {
        let b = block(vec![raw("0xa", WATCHED, OTHER, 7)]);
        let tx = &TransactionFilter::new(WATCHED).filter(&b)[0];
        assert_eq!(tx.nonce, 5);
        assert_eq!(tx.gas_limit, 21_000);
        assert_eq!(tx.gas_price, 1_000_000_000);
        assert_eq!(tx.value.to_string(), "1000000000000000000");
        assert_eq!(tx.timestamp, 0x6553f100);
        assert_eq!(tx.transaction_index, 7);
        assert_eq!(tx.block_number, Some(101));
        assert_eq!(tx.block_hash.as_deref(), Some("0xblock101"));
        assert!(tx.contract_address.is_none());
        assert!(tx.input.is_empty());
    }

    #[test]
    fn malformed_transaction_is_skipped_not_fatal() {
        let mut bad = raw("0xbad", WATCHED, OTHER, 1);
        bad.value = Some("0xnothex".into());
        let mut missing = raw("0xmissing", OTHER, WATCHED, 2);
        missing.nonce = None;
        let b = block(vec![raw("0xa", WATCHED, OTHER, 0), bad, missing, raw("0xd", OTHER, WATCHED, 3)]);

        let out = TransactionFilter::new(WATCHED).filter(&b);
        let hashes: Vec<_> = out.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xa", "0xd"]);
    }

    #[test]
    fn falls_back_to_max_fee_per_gas() {
        let mut t = raw("0xa", WATCHED, OTHER, 0);
        t.gas_price = None;
        t.max_fee_per_gas = Some("0x10".into());
        let out = TransactionFilter::new(WATCHED).filter(&block(vec![t]));
        assert_eq!(out[0].gas_price, 16);
    }

    #[test]
    fn contract_creation_has_no_recipient() {
        let mut t = raw("0xa", WATCHED, OTHER, 0);
        t.to = None;
        t.input = Some("0x6080".into());
        let out = TransactionFilter::new(WATCHED).filter(&block(vec![t]));
        assert_eq!(out.len(), 1);
        assert!(out[0].to.is_none());
        assert_eq!(out[0].input, vec![0x60, 0x80]);
    }
}
