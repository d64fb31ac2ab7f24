//! ChainSync CLI — keep one account's transactions in a local SQLite file.
//!
//! # Commands
//! ```text
//! chainsync sync    --address <addr> --rpc-url <url>
//! chainsync watch   --address <addr> --rpc-url <url>
//! chainsync status  [--json]
//! chainsync txs     [--after <hash> [--after-contract <addr>]] [--limit <n>] [--contract <addr>] [--json]
//! chainsync reset   --yes
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use chainsync_core::{
    BalanceStore, SyncOutcome, SyncStorage, TransactionQuery, TransactionStore, WatermarkStore,
};
use chainsync_engine::{SyncEngine, SyncEngineBuilder};
use chainsync_rpc::{HttpTransport, JsonRpcChainClient, RetryPolicy};
use chainsync_storage::SqliteStorage;

mod cmd_watch;
mod config;
mod logging;

use config::CliConfig;

#[derive(Parser)]
#[command(
    name = "chainsync",
    about = "Incrementally sync one account's transactions from an Ethereum node",
    long_about = "
ChainSync CLI: fetch every block since the last sync, keep the transactions
sent from or to one address, and store them in a local SQLite database.

ENVIRONMENT VARIABLES:
  CHAINSYNC_RPC_URL    JSON-RPC endpoint
  CHAINSYNC_ADDRESS    Watched address
  CHAINSYNC_DATABASE   SQLite file (default: chainsync.db)
  CHAINSYNC_CONFIG     JSON config file
  RUST_LOG             Log filter (overrides --log-level)
",
    version
)]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true, env = "CHAINSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint URL
    #[arg(long, global = true, env = "CHAINSYNC_RPC_URL")]
    rpc_url: Option<String>,

    /// Watched address (0x-prefixed, 20 bytes)
    #[arg(long, global = true, env = "CHAINSYNC_ADDRESS")]
    address: Option<String>,

    /// SQLite database file
    #[arg(long, global = true, env = "CHAINSYNC_DATABASE")]
    database: Option<String>,

    /// Log level: trace | debug | info | warn | error
    #[arg(long, global = true, env = "CHAINSYNC_LOG")]
    log_level: Option<String>,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync cycle, then refresh gas price and balance
    Sync {
        /// First block to sync when the database is empty
        #[arg(long)]
        start_block: Option<u64>,
        /// Maximum blocks fetched in this cycle (0 = no limit)
        #[arg(long)]
        max_blocks: Option<u64>,
        /// Skip the gas price and balance refresh
        #[arg(long)]
        no_refresh: bool,
    },

    /// Sync continuously until interrupted (Ctrl-C)
    Watch {
        /// First block to sync when the database is empty
        #[arg(long)]
        start_block: Option<u64>,
        /// Delay between cycles in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Show the watermark, gas price and balance
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored transactions, newest first
    Txs {
        /// Resume after this transaction hash
        #[arg(long)]
        after: Option<String>,
        /// Token contract of the --after row (defaults to --contract, else the native row)
        #[arg(long, requires = "after")]
        after_contract: Option<String>,
        /// Page size
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Only transactions of this token contract
        #[arg(long)]
        contract: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete all stored transactions, balances and sync state
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    logging::init_tracing(&config.log);

    match cli.command {
        Commands::Sync { start_block, max_blocks, no_refresh } => {
            let mut config = config;
            if let Some(block) = start_block {
                config.sync.start_block = Some(block);
            }
            if let Some(max) = max_blocks {
                config.sync.max_blocks_per_cycle = (max > 0).then_some(max);
            }
            cmd_sync(&config, !no_refresh).await
        }

        Commands::Watch { start_block, interval_ms } => {
            let mut config = config;
            if let Some(block) = start_block {
                config.sync.start_block = Some(block);
            }
            if let Some(ms) = interval_ms {
                config.sync.poll_interval_ms = ms;
            }
            let engine = build_engine(&config).await?;
            let policy = RetryPolicy::new(config.retry.clone());
            cmd_watch::run(&engine, &policy).await
        }

        Commands::Status { json } => cmd_status(&config, json).await,

        Commands::Txs { after, after_contract, limit, contract, json } => {
            let mut query = TransactionQuery::new().limit(limit);
            if let Some(hash) = after {
                query = query.after(hash);
            }
            if let Some(address) = after_contract {
                query = query.after_contract(&address);
            }
            if let Some(address) = contract {
                query = query.contract(&address);
            }
            cmd_txs(&config, &query, json).await
        }

        Commands::Reset { yes } => {
            if !yes {
                bail!("refusing to delete '{}' without --yes", config.database());
            }
            let storage = open_storage(&config).await?;
            storage.clear().await?;
            println!("Cleared {}", config.database());
            Ok(())
        }
    }
}

/// Layer flags (and their env vars) over the optional config file.
fn resolve_config(cli: &Cli) -> Result<CliConfig> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = Some(url.clone());
    }
    if let Some(address) = &cli.address {
        config.sync.address = address.clone();
    }
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if cli.log_json {
        config.log.json = true;
    }
    Ok(config)
}

async fn open_storage(config: &CliConfig) -> Result<Arc<SqliteStorage>> {
    let storage = SqliteStorage::open(config.database())
        .await
        .with_context(|| format!("open database '{}'", config.database()))?;
    Ok(Arc::new(storage))
}

async fn build_engine(config: &CliConfig) -> Result<SyncEngine> {
    let url = config
        .rpc_url
        .as_deref()
        .ok_or_else(|| anyhow!("no RPC endpoint: pass --rpc-url or set CHAINSYNC_RPC_URL"))?;
    if config.sync.address.is_empty() {
        bail!("no address: pass --address or set CHAINSYNC_ADDRESS");
    }

    let transport = HttpTransport::new(url, config.http.clone())
        .with_context(|| format!("create HTTP transport for '{url}'"))?;
    let client = Arc::new(JsonRpcChainClient::new(transport));
    let storage = open_storage(config).await?;

    SyncEngineBuilder::from_config(config.sync.clone())
        .build(client, storage)
        .context("invalid sync configuration")
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_sync(config: &CliConfig, refresh: bool) -> Result<()> {
    let engine = build_engine(config).await?;
    let outcome = engine.run_sync_cycle().await.context("sync cycle failed")?;
    print_outcome(&outcome);

    if refresh {
        let price = engine.refresh_gas_price().await.context("refresh gas price")?;
        let balance = engine.refresh_balance().await.context("refresh balance")?;
        println!("Gas price: {price} wei");
        println!("Balance:   {balance} wei");
    }
    Ok(())
}

pub(crate) fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Synced { from, to, tip, transactions } => {
            println!("Synced blocks {from}..={to} ({transactions} transactions, tip {tip})");
            if outcome.has_more() {
                println!("  {} blocks remaining", tip - to);
            }
        }
        SyncOutcome::UpToDate { height } => println!("Up to date at block {height}"),
        SyncOutcome::NodeBehind { tip, watermark } => {
            println!("Node tip {tip} is behind the stored watermark {watermark}; nothing changed")
        }
    }
}

async fn cmd_status(config: &CliConfig, as_json: bool) -> Result<()> {
    let storage = open_storage(config).await?;
    let state = storage.sync_state().await?;
    let native = storage.last_synced_block_height(false).await?;
    let token = storage.last_synced_block_height(true).await?;
    let address = (!config.sync.address.is_empty()).then_some(config.sync.address.as_str());
    let balance = match address {
        Some(a) => storage.balance(a).await?,
        None => None,
    };
    let count = storage.transaction_count().await?;

    if as_json {
        let status = serde_json::json!({
            "database": config.database(),
            "address": address,
            "last_block_height": state.last_block_height,
            "gas_price": state.gas_price.map(|p| p.to_string()),
            "balance": balance.map(|b| b.to_string()),
            "transactions": count,
            "last_native_block": native,
            "last_token_block": token,
            "updated_at": state.updated_at,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let show = |v: Option<String>| v.unwrap_or_else(|| "-".into());
    println!("Database:          {}", config.database());
    println!("Address:           {}", address.unwrap_or("-"));
    println!("Last block:        {}", show(state.last_block_height.map(|h| h.to_string())));
    println!("Gas price (wei):   {}", show(state.gas_price.map(|p| p.to_string())));
    println!("Balance (wei):     {}", show(balance.map(|b| b.to_string())));
    println!("Transactions:      {count}");
    println!("Last native block: {}", show(native.map(|h| h.to_string())));
    println!("Last token block:  {}", show(token.map(|h| h.to_string())));
    Ok(())
}

async fn cmd_txs(config: &CliConfig, query: &TransactionQuery, as_json: bool) -> Result<()> {
    let storage = open_storage(config).await?;
    let rows = storage.transactions(query).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No transactions.");
        return Ok(());
    }
    for tx in &rows {
        let block = tx
            .block_number
            .map_or_else(|| "pending".to_string(), |b| b.to_string());
        println!(
            "{}  block {:>10}  {} -> {}  {} wei",
            tx.hash,
            block,
            tx.from,
            tx.to.as_deref().unwrap_or("(create)"),
            tx.value
        );
    }
    if let Some(last) = rows.last() {
        if query.limit.is_some_and(|l| rows.len() == l as usize) {
            match &last.contract_address {
                Some(c) => println!("\nNext page: --after {} --after-contract {c}", last.hash),
                None => println!("\nNext page: --after {}", last.hash),
            }
        }
    }
    Ok(())
}
