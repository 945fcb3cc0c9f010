//! HTTP server for the medication reminder backend.
//!
//! With `EMBEDDED_WORKER=true` it also runs one delivery worker thread
//! against the same database file.

use std::sync::Arc;

use anyhow::{Context, Result};
use medreminder::config::{ServerConfig, WorkerConfig, APP_VERSION};
use medreminder::worker::{start_delivery_worker, DeliveryWorker, LoggingSender};
use medreminder::{api, db, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_tracing(config.log_pretty);

    tracing::info!(
        version = APP_VERSION,
        database = %config.database_path.display(),
        "Starting medreminder server"
    );

    // Schema is created here once; request handlers open plain connections.
    db::open_database(&config.database_path)
        .with_context(|| format!("cannot open database {}", config.database_path.display()))?;

    let worker = if config.embedded_worker {
        let worker_config = WorkerConfig::from_env()?;
        let sender = Arc::new(LoggingSender::new(worker_config.channel));
        let handle = start_delivery_worker(
            &config.database_path,
            DeliveryWorker::new(worker_config, sender),
        )?;
        tracing::info!(worker_id = handle.worker_id(), "Embedded delivery worker running");
        Some(handle)
    } else {
        None
    };

    let server = api::start_api_server(&config)
        .await
        .with_context(|| format!("cannot bind {}:{}", config.host, config.port))?;
    tracing::info!(addr = %server.local_addr(), "Listening");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    server.shutdown().await;
    if let Some(handle) = worker {
        tokio::task::spawn_blocking(move || handle.join()).await?;
    }

    Ok(())
}
