//! Standalone delivery worker. Run as many as needed against one database
//! file; leases on the queue keep their claims disjoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use medreminder::config::{self, WorkerConfig, APP_VERSION};
use medreminder::worker::{start_delivery_worker, DeliveryWorker, LoggingSender};
use medreminder::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let env = |key: &str| std::env::var(key).ok();
    init_tracing(config::parse_flag("LOG_PRETTY", &env)?);

    let database_path = config::database_path_from(&env);
    let worker_config = WorkerConfig::from_lookup(env)?;

    tracing::info!(
        version = APP_VERSION,
        worker_id = %worker_config.worker_id,
        channel = %worker_config.channel,
        database = %database_path.display(),
        "Starting delivery worker"
    );

    let sender = Arc::new(LoggingSender::new(worker_config.channel));
    let handle = start_delivery_worker(&database_path, DeliveryWorker::new(worker_config, sender))
        .with_context(|| format!("cannot start worker on {}", database_path.display()))?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested, finishing current tick");

    tokio::task::spawn_blocking(move || handle.join()).await?;
    Ok(())
}
