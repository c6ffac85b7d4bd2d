// src/engine/leaderboard.rs

use crate::{
    config::MAX_LEADERBOARD_LIMIT,
    error::AppError,
    models::ranking::{LeaderboardResponse, RankScope},
    store::Store,
};

/// A resolved leaderboard query.
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardQuery {
    pub scope: RankScope,
    pub limit: i64,

    /// Student whose own standing should be reported when outside the top.
    pub student_id: Option<i64>,
}

/// Answers a ranked top-N query from the materialized ranking records.
/// Read-only: never mutates ranking state.
///
/// When `student_id` is set and missing from the top set, the student's own
/// record is fetched separately and flagged as `requester_position` so
/// callers can render "you are #N" outside the main list.
pub async fn get_leaderboard(
    store: &dyn Store,
    query: &LeaderboardQuery,
) -> Result<LeaderboardResponse, AppError> {
    let limit = query.limit.clamp(1, MAX_LEADERBOARD_LIMIT);

    let entries = store.top_rankings(query.scope, limit).await?;

    let requester_position = match query.student_id {
        Some(id) if !entries.iter().any(|e| e.student_id == id) => {
            store.ranking_entry(id, query.scope).await?
        }
        _ => None,
    };

    Ok(LeaderboardResponse {
        entries,
        requester_position,
    })
}
