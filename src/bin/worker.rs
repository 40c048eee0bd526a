//! Chinook worker - MCP server over stdio
//!
//! Reads JSON-RPC requests on stdin and answers catalogue searches on
//! stdout. Logs go to stderr.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chinook_bridge::mcp::{McpServer, MusicHandler, Transport};
use chinook_bridge::{Store, StoreConfig, VERSION};

#[derive(Parser, Debug)]
#[command(name = "chinook-worker")]
#[command(about = "Music catalogue search worker (MCP over stdio)")]
#[command(version)]
struct Args {
    /// Database path
    #[arg(long, env = "CHINOOK_DB_PATH", default_value = "chinook.db")]
    db_path: String,

    /// SQLite busy timeout in milliseconds
    #[arg(long, env = "CHINOOK_BUSY_TIMEOUT_MS", default_value = "5000")]
    busy_timeout_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stdout carries protocol messages only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = StoreConfig::new(args.db_path);
    config.busy_timeout_ms = args.busy_timeout_ms;
    let store = Store::new(config);

    if let Err(e) = store.check() {
        tracing::warn!("{}; searches will report errors until it is fixed", e);
    }

    tracing::info!(
        "Chinook worker v{} serving {}",
        VERSION,
        store.config().resolved_path().display()
    );

    let server = McpServer::new(MusicHandler::new(store));
    let mut transport = Transport::stdio();
    server.run(&mut transport).await?;

    tracing::info!("Worker shutting down");
    Ok(())
}
