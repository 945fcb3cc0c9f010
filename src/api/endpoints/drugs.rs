use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::Drug;
use crate::prescriptions::{self, NewDrug};

/// `POST /api/drugs`: names are unique; a duplicate is a 409.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewDrug>, JsonRejection>,
) -> Result<(StatusCode, Json<Drug>), ApiError> {
    let Json(input) = payload?;
    let conn = ctx.open_db()?;
    let drug = prescriptions::register_drug(&conn, &input, chrono::Utc::now())?;
    Ok((StatusCode::CREATED, Json(drug)))
}

/// `GET /api/drugs`: alphabetical.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Drug>>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::list_drugs(&conn)?))
}

/// `PUT /api/drugs/:id`: rename.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<NewDrug>, JsonRejection>,
) -> Result<Json<Drug>, ApiError> {
    let id = parse_id(&id, "drug")?;
    let Json(input) = payload?;
    let conn = ctx.open_db()?;
    Ok(Json(prescriptions::rename_drug(&conn, &id, &input)?))
}

/// `DELETE /api/drugs/:id`: 204, or 409 while a prescription still names it.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, "drug")?;
    let conn = ctx.open_db()?;
    prescriptions::delete_drug(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
