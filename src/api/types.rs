//! Shared state for the API layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::db;

/// Shared context for all API routes.
///
/// Each request opens its own short-lived connection; SQLite in WAL mode
/// handles the concurrency, including with out-of-process workers.
#[derive(Clone)]
pub struct ApiContext {
    db_path: Arc<PathBuf>,
}

impl ApiContext {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open_db(&self) -> Result<Connection, ApiError> {
        Ok(db::open_connection(&self.db_path)?)
    }
}
