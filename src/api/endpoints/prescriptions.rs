//! Prescription endpoints.
//!
//! Creation is the only write path into the reminder queue: every drug line
//! with a reminder plan is expanded and enqueued in the same transaction.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{parse_id, parse_optional_id};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::PrescriptionRecord;
use crate::prescriptions::{self, CreatedPrescription, NewPrescription, PrescriptionDetail};

#[derive(Deserialize)]
pub struct ListQuery {
    pub patient_id: Option<String>,
}

/// `POST /api/prescriptions`
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewPrescription>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedPrescription>), ApiError> {
    let Json(input) = payload?;
    let mut conn = ctx.open_db()?;
    let created = prescriptions::create_prescription(&mut conn, &input, chrono::Utc::now())?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/prescriptions?patient_id=`: newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PrescriptionRecord>>, ApiError> {
    let patient_id = parse_optional_id(query.patient_id.as_deref(), "patient")?;
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::list_prescriptions(&conn, patient_id.as_ref())?))
}

/// `GET /api/prescriptions/:id`: record plus drug lines.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PrescriptionDetail>, ApiError> {
    let id = parse_id(&id, "prescription")?;
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::get_prescription(&conn, &id)?))
}

/// `PATCH /api/prescriptions/:id/complete`
pub async fn complete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PrescriptionRecord>, ApiError> {
    let id = parse_id(&id, "prescription")?;
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::complete_prescription(&conn, &id)?))
}
