//! Delivery worker: claims due reminders, hands them to a sender, and
//! records what happened.
//!
//! - `sender`: the injectable delivery capability
//! - `tick`: one claim → send → finalize pass
//! - `background`: fixed-interval loop on a dedicated thread

pub mod background;
pub mod sender;
pub mod tick;

pub use background::{start_delivery_worker, DeliveryWorkerHandle};
pub use sender::{LoggingSender, ReminderSender, SendError};
pub use tick::{DeliveryWorker, TickReport};

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Lease on reminder {0} was lost before it could be finalized")]
    ClaimLost(Uuid),

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
