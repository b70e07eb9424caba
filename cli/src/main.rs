//! ChainSQL CLI: manage the chain tables and feed them captured node events.
//!
//! # Commands
//! ```
//! chainsql init    [--wipe]
//! chainsql drop
//! chainsql replay  --file <events.jsonl>
//! chainsql decode  --abi <abi.json> --action <name> --data <hex>
//! chainsql info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chainsql_abi::{AbiDef, AbiSerializer};
use chainsql_core::{init_tracing, ConnectorConfig};
use chainsql_storage::{ChainDatabase, SqliteStorage, TableStore};

mod cmd_replay;

#[derive(Parser)]
#[command(
    name = "chainsql",
    about = "ChainSQL: EOSIO chain events to SQL",
    long_about = "
ChainSQL CLI: create the chain tables, replay captured node events through
the ingestion pipeline, and decode action payloads against an ABI.

ENVIRONMENT VARIABLES:
  CHAINSQL_DATABASE_URL   Database URL (overrides the config file)
  CHAINSQL_QUEUE_SIZE     Per-queue backpressure threshold
",
    version
)]
struct Cli {
    /// JSON config file (defaults apply to missing keys)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, e.g. sqlite:./chain.db?mode=rwc
    #[arg(long, global = true)]
    database: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the chain tables
    Init {
        /// Drop existing tables first
        #[arg(long)]
        wipe: bool,
    },

    /// Drop the chain tables
    Drop,

    /// Replay a JSON-lines file of captured events into the database
    Replay {
        /// One tagged event per line, e.g. {"kind":"transaction_trace",...}
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Decode an action payload with an ABI JSON file
    Decode {
        /// Path to the ABI JSON file
        #[arg(long)]
        abi: PathBuf,
        /// Action name declared in the ABI
        #[arg(long)]
        action: String,
        /// Payload as hex
        #[arg(long)]
        data: String,
    },

    /// Show configuration and table row counts
    Info,
}

fn load_config(cli: &Cli) -> Result<ConnectorConfig> {
    let mut config = match &cli.config {
        Some(path) => ConnectorConfig::from_file(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => ConnectorConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(url) = &cli.database {
        config.database_url = url.clone();
    }
    if cli.verbose {
        config.log.level = "debug".into();
    }
    config.validate()?;
    Ok(config)
}

async fn open(config: &ConnectorConfig) -> Result<Arc<SqliteStorage>> {
    let store = SqliteStorage::open(&config.database_url)
        .await
        .with_context(|| format!("open database '{}'", config.database_url))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.log)?;

    match cli.command {
        Commands::Init { wipe } => cmd_init(&config, wipe).await,
        Commands::Drop => cmd_drop(&config).await,
        Commands::Replay { file } => cmd_replay::run(&config, &file).await,
        Commands::Decode { abi, action, data } => cmd_decode(&abi, &action, &data),
        Commands::Info => cmd_info(&config).await,
    }
}

async fn cmd_init(config: &ConnectorConfig, wipe: bool) -> Result<()> {
    let db = ChainDatabase::new(open(config).await?);
    db.prepare(wipe || config.wipe_on_startup).await?;
    println!("✓ Tables ready in {}", config.database_url);
    Ok(())
}

async fn cmd_drop(config: &ConnectorConfig) -> Result<()> {
    open(config).await?.drop_tables().await?;
    println!("✓ Tables dropped from {}", config.database_url);
    Ok(())
}

fn cmd_decode(abi_path: &Path, action: &str, data: &str) -> Result<()> {
    let text = std::fs::read_to_string(abi_path)
        .with_context(|| format!("read ABI file '{}'", abi_path.display()))?;
    let serializer = AbiSerializer::new(AbiDef::from_json(&text)?);

    let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data))
        .context("invalid payload hex")?;
    let value = serializer.decode_action(action, &bytes)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn cmd_info(config: &ConnectorConfig) -> Result<()> {
    println!("ChainSQL v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Database:     {}", config.database_url);
    println!("Queue size:   {}", config.queue_size);
    println!(
        "Backoff:      {}ms base, {}ms step",
        config.backoff_base_ms, config.backoff_step_ms
    );
    println!();

    let counts = open(config).await?.counts().await?;
    println!("Rows:");
    println!("  blocks            {}", counts.blocks);
    println!("  transactions      {}", counts.transactions);
    println!("  actions           {}", counts.actions);
    println!("  actions_accounts  {}", counts.actions_accounts);
    println!("  accounts          {}", counts.accounts);
    println!("  accounts_keys     {}", counts.accounts_keys);
    Ok(())
}
