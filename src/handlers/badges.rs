// src/handlers/badges.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, state::DynStore};

/// The active badge catalog.
pub async fn list_badges(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    let badges = store.list_active_badges().await?;
    Ok(Json(badges))
}

/// All badges a student has earned, with award context.
pub async fn list_student_awards(
    State(store): State<DynStore>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store
        .get_student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    let awards = store.awards_for_student(student_id).await?;
    Ok(Json(awards))
}
