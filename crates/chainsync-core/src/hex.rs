//! Hex codec for JSON-RPC quantities, byte strings and block tags.
//!
//! Every numeric field a node returns arrives as a `"0x"`-prefixed string.
//! The functions here accept the prefix optionally and never panic.

use std::cmp::Ordering;
use std::fmt;

use alloy_primitives::U256;
use thiserror::Error;

/// Errors produced when decoding hex wire strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("Malformed hex string {0:?}")]
    Malformed(String),

    #[error("Hex value {0:?} does not fit the target integer")]
    Overflow(String),
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Quantity digits: non-empty and all hex.
fn quantity_digits(s: &str) -> Result<&str, HexError> {
    let digits = strip_prefix(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(HexError::Malformed(s.to_string()));
    }
    Ok(digits)
}

/// Decode a hex quantity into a `u64`.
pub fn decode_int(s: &str) -> Result<u64, HexError> {
    let digits = quantity_digits(s)?;
    u64::from_str_radix(digits, 16).map_err(|_| HexError::Overflow(s.to_string()))
}

/// Decode a hex quantity that may exceed 64 bits (wei and token amounts).
pub fn decode_big(s: &str) -> Result<U256, HexError> {
    let digits = quantity_digits(s)?;
    U256::from_str_radix(digits, 16).map_err(|_| HexError::Overflow(s.to_string()))
}

/// Decode a hex byte string. `"0x"` is the empty string; an odd number of
/// digits is padded with a leading zero nibble.
pub fn decode_bytes(s: &str) -> Result<Vec<u8>, HexError> {
    let digits = strip_prefix(s);
    let decoded = if digits.len() % 2 == 1 {
        ::hex::decode(format!("0{digits}"))
    } else {
        ::hex::decode(digits)
    };
    decoded.map_err(|_| HexError::Malformed(s.to_string()))
}

/// Encode an integer as a minimal `0x` quantity (`0x0` for zero).
pub fn encode_int(n: u64) -> String {
    format!("{n:#x}")
}

/// Encode bytes as a `0x`-prefixed lowercase hex string.
pub fn encode_bytes(bytes: &[u8]) -> String {
    format!("0x{}", ::hex::encode(bytes))
}

// ─── BlockTag ─────────────────────────────────────────────────────────────────

/// Block selector accepted by `eth_getBlockByNumber` / `eth_getBalance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    Latest,
    Earliest,
    Pending,
    Number(u64),
}

impl BlockTag {
    /// Wire form: `"latest"`, `"earliest"`, `"pending"` or a hex quantity.
    pub fn encode(&self) -> String {
        match self {
            Self::Latest => "latest".into(),
            Self::Earliest => "earliest".into(),
            Self::Pending => "pending".into(),
            Self::Number(n) => encode_int(*n),
        }
    }

    /// Returns the height for numeric tags.
    pub fn number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Partial order only. `Earliest` precedes everything, numbers compare
/// numerically and precede the symbolic head tags, and `Latest` vs `Pending`
/// is left incomparable.
impl PartialOrd for BlockTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use BlockTag::*;
        match (self, other) {
            (Number(a), Number(b)) => Some(a.cmp(b)),
            (Earliest, Earliest) | (Latest, Latest) | (Pending, Pending) => Some(Ordering::Equal),
            (Earliest, _) => Some(Ordering::Less),
            (_, Earliest) => Some(Ordering::Greater),
            (Number(_), Latest | Pending) => Some(Ordering::Less),
            (Latest | Pending, Number(_)) => Some(Ordering::Greater),
            (Latest, Pending) | (Pending, Latest) => None,
        }
    }
}
