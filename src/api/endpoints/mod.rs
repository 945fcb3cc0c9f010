//! API endpoint handlers, one module per resource.

pub mod drugs;
pub mod health;
pub mod patients;
pub mod prescriptions;
pub mod reminders;

use uuid::Uuid;

use crate::api::error::ApiError;

/// Parse a path or query id, rejecting anything that is not a UUID.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {what} id")))
}

/// Optional query id: absent or blank means no filter.
pub(crate) fn parse_optional_id(raw: Option<&str>, what: &str) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_id(value, what).map(Some),
    }
}
