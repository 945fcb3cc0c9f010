//! API router.
//!
//! Layers (outermost first): request tracing → permissive CORS → handler.

use std::path::PathBuf;

use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the full router for the database at `db_path`.
///
/// The database must already be initialised (`db::open_database`).
pub fn api_router(db_path: impl Into<PathBuf>) -> Router {
    build_router(ApiContext::new(db_path))
}

pub fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail).put(endpoints::patients::update),
        )
        .route(
            "/drugs",
            get(endpoints::drugs::list).post(endpoints::drugs::create),
        )
        .route(
            "/drugs/:id",
            put(endpoints::drugs::update).delete(endpoints::drugs::delete),
        )
        .route(
            "/prescriptions",
            get(endpoints::prescriptions::list).post(endpoints::prescriptions::create),
        )
        .route("/prescriptions/:id", get(endpoints::prescriptions::detail))
        .route(
            "/prescriptions/:id/complete",
            patch(endpoints::prescriptions::complete),
        )
        .route("/reminders/schedule", get(endpoints::reminders::schedule))
        .route(
            "/reminders/schedule/:id/confirm",
            post(endpoints::reminders::confirm),
        )
        .route(
            "/reminders/attempts",
            get(endpoints::reminders::attempts).post(endpoints::reminders::record_attempt),
        );

    Router::new()
        .route("/health", get(endpoints::health::check))
        .nest("/api", api)
        .with_state(ctx)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
