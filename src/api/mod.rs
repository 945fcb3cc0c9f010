//! HTTP surface for clinicians, operators and patient-facing apps.
//!
//! Routes live under `/api/` plus an unauthenticated `/health` probe.
//! `api_router()` returns a plain `Router` so tests can drive it with
//! `oneshot` and the server binary can mount it on a listener.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server, start_api_server_on, ApiServer};
pub use types::ApiContext;
