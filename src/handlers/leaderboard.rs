// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    config::DEFAULT_LEADERBOARD_LIMIT,
    engine::leaderboard::{self, LeaderboardQuery},
    error::AppError,
    models::ranking::{LeaderboardParams, RankScope},
    state::DynStore,
};

/// Top-N leaderboard query, global or institutional. Supplying `student_id`
/// additionally reports that student's own standing when they are outside
/// the returned top set.
pub async fn get_leaderboard(
    State(store): State<DynStore>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let scope = match params.scope.as_deref().unwrap_or("global") {
        "global" => RankScope::Global,
        "institutional" => {
            let institution_id = params.institution_id.ok_or_else(|| {
                AppError::BadRequest(
                    "institution_id is required for institutional scope".to_string(),
                )
            })?;
            RankScope::Institution(institution_id)
        }
        other => {
            return Err(AppError::BadRequest(format!("Unknown scope '{}'", other)));
        }
    };

    let query = LeaderboardQuery {
        scope,
        limit: params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT),
        student_id: params.student_id,
    };

    let response = leaderboard::get_leaderboard(store.as_ref(), &query).await?;
    Ok(Json(response))
}
