//! `--config` file: JSON with the same knobs as the command-line flags.
//!
//! ```json
//! {
//!   "rpc_url": "https://eth.llamarpc.com",
//!   "database": "./wallet.db",
//!   "sync": { "address": "0x...", "start_block": 19000000, "fetch_concurrency": 8 },
//!   "retry": { "max_retries": 10 },
//!   "log": { "level": "info", "json": true }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chainsync_core::SyncConfig;
use chainsync_rpc::{HttpClientConfig, RetryConfig};

use crate::logging::LogConfig;

pub const DEFAULT_DATABASE: &str = "chainsync.db";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub rpc_url: Option<String>,
    pub database: Option<String>,
    pub sync: SyncConfig,
    pub retry: RetryConfig,
    pub http: HttpClientConfig,
    pub log: LogConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parse config file '{}'", path.display()))
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }
}
