//! ShopMirror HTTP server binary

use anyhow::Context;
use clap::Parser;
use mirror_config::Config;
use mirror_server::{build_router, AppState};
use mirror_store::Db;
use mirror_sync::SyncOrchestrator;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "shopmirror-server", about = "ShopMirror synchronization server", version)]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "shopmirror.toml")]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    mirror_common::telemetry::init_tracing(args.verbose, args.json_logs);

    let config = Config::load(&args.config)?;
    config.validate()?;

    let db = Db::open(&config.database.path)
        .with_context(|| format!("Failed to open database at {}", config.database.path.display()))?;
    let orchestrator = SyncOrchestrator::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build sync engine: {}", e))?;

    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        orchestrator: Arc::new(orchestrator),
    };
    let app = build_router(state);

    let bind_addr = args.bind.unwrap_or(config.server.bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!(%bind_addr, "ShopMirror server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
