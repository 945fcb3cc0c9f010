//! Reminder endpoints:
//! - `GET /api/reminders/schedule?drug_id=&status=`: queue, oldest first
//! - `POST /api/reminders/schedule/:id/confirm`: patient confirmed intake
//! - `POST /api/reminders/attempts`: record an externally observed attempt
//! - `GET /api/reminders/attempts?schedule_id=`

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{parse_id, parse_optional_id};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::enums::ReminderStatus;
use crate::models::{ReminderAttempt, ReminderSchedule, ScheduleFilter};
use crate::reminders::{self, ConfirmOutcome, NewAttempt};

#[derive(Deserialize)]
pub struct ScheduleQuery {
    /// Owning prescription drug line.
    pub drug_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct AttemptsQuery {
    pub schedule_id: Option<String>,
}

pub async fn schedule(
    State(ctx): State<ApiContext>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<ReminderSchedule>>, ApiError> {
    let prescription_drug_id = parse_optional_id(query.drug_id.as_deref(), "drug")?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            ReminderStatus::from_str(raw)
                .map_err(|_| ApiError::Validation(format!("Unknown reminder status '{raw}'")))?,
        ),
    };

    let conn = ctx.open_db()?;
    let entries = reminders::list_schedule(&conn, &ScheduleFilter {
        prescription_drug_id,
        status,
    })?;
    Ok(Json(entries))
}

pub async fn confirm(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ReminderSchedule>, ApiError> {
    let id = parse_id(&id, "schedule")?;
    let conn = ctx.open_db()?;
    match reminders::confirm_intake(&conn, &id, chrono::Utc::now())? {
        ConfirmOutcome::Confirmed(entry) => Ok(Json(entry)),
        ConfirmOutcome::NothingToDo => Err(ApiError::NotFound(
            "Reminder not found or already completed".into(),
        )),
    }
}

pub async fn record_attempt(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewAttempt>, JsonRejection>,
) -> Result<(StatusCode, Json<ReminderAttempt>), ApiError> {
    let Json(input) = payload?;
    let conn = ctx.open_db()?;
    let attempt = reminders::record_attempt(&conn, &input, chrono::Utc::now())?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

pub async fn attempts(
    State(ctx): State<ApiContext>,
    Query(query): Query<AttemptsQuery>,
) -> Result<Json<Vec<ReminderAttempt>>, ApiError> {
    let schedule_id = parse_optional_id(query.schedule_id.as_deref(), "schedule")?;
    let conn = ctx.open_db()?;
    Ok(Json(reminders::list_attempts(&conn, schedule_id.as_ref())?))
}
