// src/handlers/admin.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        badge::CreateBadgeRequest, quiz::CreateQuizRequest, student::CreateStudentRequest,
    },
    state::DynStore,
};

/// Registers a student with the engine.
pub async fn create_student(
    State(store): State<DynStore>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let student = store.create_student(&payload).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// Registers a quiz's point schema and passing threshold.
pub async fn create_quiz(
    State(store): State<DynStore>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let quiz = store.create_quiz(&payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Adds a badge definition to the catalog. Criteria are optional per field;
/// a definition with no criteria matches unconditionally and is only ever
/// granted manually, never by the automatic evaluation pass.
pub async fn create_badge(
    State(store): State<DynStore>,
    Json(payload): Json<CreateBadgeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let badge = store.create_badge(&payload).await?;
    Ok((StatusCode::CREATED, Json(badge)))
}
