//! Sync configuration, cycle phases and outcomes.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Configuration for one sync engine (one watched address).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// The watched account (`0x` + 40 hex digits).
    pub address: String,
    /// First block to sync when no watermark has been stored yet.
    /// `None` starts from genesis.
    pub start_block: Option<u64>,
    /// Upper bound on blocks fetched in a single cycle. `None` = whole range.
    pub max_blocks_per_cycle: Option<u64>,
    /// Number of block fetches kept in flight (results are applied in order).
    pub fetch_concurrency: usize,
    /// Delay between cycles when run by a scheduler (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            start_block: None,
            max_blocks_per_cycle: Some(1000),
            fetch_concurrency: 4,
            poll_interval_ms: 15_000,
        }
    }
}

impl SyncConfig {
    /// Create a config for `address` with default tuning.
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), SyncError> {
        let digits = self
            .address
            .strip_prefix("0x")
            .or_else(|| self.address.strip_prefix("0X"))
            .ok_or_else(|| SyncError::Config(format!("address {:?} lacks 0x prefix", self.address)))?;
        if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SyncError::Config(format!(
                "address {:?} is not a 20-byte hex address",
                self.address
            )));
        }
        if self.fetch_concurrency == 0 {
            return Err(SyncError::Config("fetch_concurrency must be at least 1".into()));
        }
        if self.max_blocks_per_cycle == Some(0) {
            return Err(SyncError::Config("max_blocks_per_cycle must be at least 1".into()));
        }
        Ok(())
    }

    /// Watermark assumed when none has been stored.
    pub fn initial_watermark(&self) -> u64 {
        self.start_block.map_or(0, |b| b.saturating_sub(1))
    }

    /// The inclusive block range a cycle should fetch, or `None` when the node
    /// is not ahead of `watermark`.
    pub fn plan_range(&self, watermark: u64, tip: u64) -> Option<(u64, u64)> {
        if tip <= watermark {
            return None;
        }
        let target = match self.max_blocks_per_cycle {
            Some(max) => tip.min(watermark.saturating_add(max)),
            None => tip,
        };
        Some((watermark + 1, target))
    }
}

/// Where a sync cycle currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    Idle,
    FetchingTip,
    /// Fetching `next ..= target`.
    FetchingBlocks { next: u64, target: u64 },
    Committing,
    /// The last cycle failed; the watermark was left untouched.
    Failed(String),
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::FetchingTip => write!(f, "fetching-tip"),
            Self::FetchingBlocks { next, target } => write!(f, "fetching-blocks({next}..={target})"),
            Self::Committing => write!(f, "committing"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// `from ..= to` was fetched and committed; the watermark is now `to`.
    Synced {
        from: u64,
        to: u64,
        tip: u64,
        transactions: usize,
    },
    /// The node's tip equals the watermark.
    UpToDate { height: u64 },
    /// The node reports a tip below the watermark; nothing was changed.
    NodeBehind { tip: u64, watermark: u64 },
}

impl SyncOutcome {
    /// Returns `true` if the cycle stopped short of the node's tip.
    pub fn has_more(&self) -> bool {
        matches!(self, Self::Synced { to, tip, .. } if to < tip)
    }
}
