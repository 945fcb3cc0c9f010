//! Background delivery loop.
//!
//! Spawns a dedicated thread that owns its own SQLite connection and runs
//! one tick per interval. A tick always runs to completion; the interval is
//! measured from the start of one tick to the start of the next, and a slow
//! tick simply delays the next one.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::Connection;

use super::tick::DeliveryWorker;
use super::WorkerError;
use crate::db::open_database;

/// Upper bound on how long shutdown waits for the sleeping loop to notice.
const SLEEP_GRANULARITY: Duration = Duration::from_millis(100);

/// Handle for a running delivery worker thread.
///
/// Dropping the handle requests shutdown and waits for the thread.
pub struct DeliveryWorkerHandle {
    worker_id: String,
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl DeliveryWorkerHandle {
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Request graceful shutdown. A tick in progress finishes first.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Request shutdown and wait for the thread to exit.
    pub fn join(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                tracing::error!(worker_id = %self.worker_id, "Delivery worker thread panicked");
            }
        }
    }
}

impl Drop for DeliveryWorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open a connection to `db_path` and start ticking on a new thread.
///
/// The connection is opened before the thread starts so a bad path fails here.
pub fn start_delivery_worker(
    db_path: &Path,
    worker: DeliveryWorker,
) -> Result<DeliveryWorkerHandle, WorkerError> {
    let conn = open_database(db_path)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    let worker_id = worker.worker_id().to_string();

    let handle = std::thread::Builder::new()
        .name(format!("delivery-{worker_id}"))
        .spawn(move || {
            tracing::info!(
                worker_id = %worker.worker_id(),
                interval_ms = worker.config().interval.as_millis() as u64,
                batch_size = worker.config().batch_size,
                "Delivery worker started"
            );
            worker_loop(conn, &worker, &flag);
            tracing::info!(worker_id = %worker.worker_id(), "Delivery worker stopped");
        })?;

    Ok(DeliveryWorkerHandle {
        worker_id,
        shutdown,
        handle: Some(handle),
    })
}

fn worker_loop(mut conn: Connection, worker: &DeliveryWorker, shutdown: &AtomicBool) {
    let interval = worker.config().interval;

    while !shutdown.load(Ordering::Relaxed) {
        let started = Instant::now();

        match worker.run_tick(&mut conn, Utc::now()) {
            Ok(report) if report.claimed > 0 => {
                tracing::info!(
                    worker_id = %worker.worker_id(),
                    claimed = report.claimed,
                    sent = report.sent,
                    already_completed = report.already_completed,
                    failed_attempts = report.failed_attempts,
                    "Tick finished"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(worker_id = %worker.worker_id(), error = %e, "Tick failed");
            }
        }

        // Sleep in small increments for responsive shutdown
        let next = started + interval;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            let now = Instant::now();
            if now >= next {
                break;
            }
            std::thread::sleep((next - now).min(SLEEP_GRANULARITY));
        }
    }
}
