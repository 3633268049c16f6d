//! Asset ledger service binary

use anyhow::Context;
use asset_dag::{spawn_ledger_actor, Config, Ledger, Metrics};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match std::env::var("ASSET_DAG_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading config {}", path))?,
        Err(_) => Config::from_env().context("reading config from environment")?,
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting asset ledger"
    );

    let mailbox_capacity = config.actor.mailbox_capacity;
    let metrics = Metrics::new().context("registering metrics")?;
    let ledger = Ledger::open(config)
        .context("opening ledger")?
        .with_metrics(metrics);

    // A broken snapshot is reported, not fatal
    if let Err(e) = ledger.verify_integrity() {
        tracing::error!("Snapshot failed integrity check: {}", e);
    }

    let stats = ledger.stats();
    tracing::info!(
        nodes = stats.total_nodes,
        tips = stats.total_tips,
        assets = stats.unique_assets,
        users = stats.unique_users,
        "Ledger ready"
    );

    let handle = spawn_ledger_actor(Arc::new(ledger), mailbox_capacity);

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down asset ledger");
    handle.shutdown().await?;
    Ok(())
}
