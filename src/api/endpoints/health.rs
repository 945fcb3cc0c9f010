use axum::Json;
use serde::Serialize;

use crate::config::{APP_NAME, APP_VERSION};

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

/// `GET /health`: liveness probe. Does not touch the database.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: APP_NAME,
        version: APP_VERSION,
    })
}
