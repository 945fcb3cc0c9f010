//! Read side of the reminder queue, intake confirmation, and manual attempt
//! recording for operators and patient-facing surfaces.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::{AttemptResult, DeliveryChannel};
use crate::models::{ReminderAttempt, ReminderSchedule, ScheduleFilter};

/// Result of a confirmation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed(ReminderSchedule),
    /// Entry is absent or was already completed. No state changed.
    NothingToDo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAttempt {
    pub schedule_id: Uuid,
    pub channel: DeliveryChannel,
    pub result: AttemptResult,
}

pub fn list_schedule(
    conn: &Connection,
    filter: &ScheduleFilter,
) -> Result<Vec<ReminderSchedule>, DatabaseError> {
    db::list_reminders(conn, filter)
}

/// Patient acknowledged intake: any non-terminal entry becomes `completed`.
/// Confirming twice is harmless; the first confirmation time is kept.
pub fn confirm_intake(
    conn: &Connection,
    schedule_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<ConfirmOutcome, DatabaseError> {
    match db::confirm_reminder(conn, schedule_id, &now)? {
        Some(entry) => {
            tracing::info!(schedule_id = %schedule_id, "Intake confirmed");
            Ok(ConfirmOutcome::Confirmed(entry))
        }
        None => {
            tracing::debug!(schedule_id = %schedule_id, "Confirmation had nothing to do");
            Ok(ConfirmOutcome::NothingToDo)
        }
    }
}

/// Append an attempt reported from outside the worker (e.g. a delivery receipt).
pub fn record_attempt(
    conn: &Connection,
    input: &NewAttempt,
    now: DateTime<Utc>,
) -> Result<ReminderAttempt, DatabaseError> {
    if db::get_reminder_status(conn, &input.schedule_id)?.is_none() {
        return Err(DatabaseError::not_found("reminder_schedule", &input.schedule_id));
    }

    let attempt = ReminderAttempt {
        id: Uuid::new_v4(),
        schedule_id: input.schedule_id,
        channel: input.channel,
        result: input.result,
        attempted_at: now,
    };
    db::insert_attempt(conn, &attempt)?;
    Ok(attempt)
}

pub fn list_attempts(
    conn: &Connection,
    schedule_id: Option<&Uuid>,
) -> Result<Vec<ReminderAttempt>, DatabaseError> {
    db::list_attempts(conn, schedule_id)
}
