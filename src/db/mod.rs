pub mod repository;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::ErrorCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid stored value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

impl DatabaseError {
    pub fn not_found(entity_type: &str, id: &Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    /// SQLite could not get the lock it needed within the busy timeout.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }
}

/// Turn UNIQUE/CHECK/FK failures into `ConstraintViolation`, pass everything else through.
pub fn map_constraint(err: rusqlite::Error, context: &str) -> DatabaseError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, ref message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            DatabaseError::ConstraintViolation(format!("{context}: {detail}"))
        }
        other => DatabaseError::Sqlite(other),
    }
}

/// Fixed-width UTC text (`2024-01-01T02:30:00.000Z`). Every stored instant uses
/// this shape so string comparison in SQL orders chronologically. The width only
/// holds for years 0000 to 9999; the schedule generator refuses anything else.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

pub fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|_| DatabaseError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_are_fixed_width_and_sortable() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 2, 30, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);
        let a = format_timestamp(&early);
        let b = format_timestamp(&late);
        assert_eq!(a, "2024-01-01T02:30:00.000Z");
        assert_eq!(b, "2024-01-01T02:30:01.500Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn timestamp_parse_round_trips() {
        let instant = Utc.with_ymd_and_hms(2030, 7, 4, 23, 59, 0).unwrap();
        assert_eq!(parse_timestamp("t", &format_timestamp(&instant)).unwrap(), instant);
        assert!(matches!(
            parse_timestamp("scheduled_at", "yesterday"),
            Err(DatabaseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn bad_uuid_is_reported_with_field() {
        let err = parse_uuid("schedule_id", "nope").unwrap_err();
        assert_eq!(err.to_string(), "Invalid stored value for schedule_id: nope");
    }
}
