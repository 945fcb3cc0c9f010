//! Patient endpoints:
//! - `POST /api/patients`: register with a fixed timezone offset
//! - `GET /api/patients`: alphabetical
//! - `GET /api/patients/:id`
//! - `PUT /api/patients/:id`: partial update, absent fields are kept

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::Patient;
use crate::prescriptions::{self, NewPatient, PatientUpdate};

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(input) = payload?;
    let conn = ctx.open_db()?;
    let patient = prescriptions::register_patient(&conn, &input, chrono::Utc::now())?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::list_patients(&conn)?))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::get_patient(&conn, &id)?))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<PatientUpdate>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let Json(input) = payload?;
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::update_patient(&conn, &id, &input)?))
}
