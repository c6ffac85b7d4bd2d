// src/handlers/rankings.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    engine::ranking,
    error::AppError,
    models::ranking::{RankScope, RankingView},
    state::DynStore,
};

/// Current ranking snapshot for one student.
pub async fn get_student_ranking(
    State(store): State<DynStore>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = store
        .get_student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    // A student who exists but has never submitted gets a freshly computed
    // all-zero record rather than a 404.
    let record = match store.get_ranking(student_id).await? {
        Some(record) => record,
        None => ranking::recompute_student(store.as_ref(), student_id).await?,
    };

    Ok(Json(RankingView {
        display_name: student.display_name,
        record,
    }))
}

/// Batch trigger: reassign global positions and percentiles.
pub async fn recompute_global(
    State(store): State<DynStore>,
) -> Result<impl IntoResponse, AppError> {
    let updated = ranking::recompute_scope(store.as_ref(), RankScope::Global).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

/// Batch trigger: reassign positions and percentiles within one institution.
pub async fn recompute_institutional(
    State(store): State<DynStore>,
    Path(institution_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let updated =
        ranking::recompute_scope(store.as_ref(), RankScope::Institution(institution_id)).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}
