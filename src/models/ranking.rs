// src/models/ranking.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Scope of a ranking computation or leaderboard query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankScope {
    Global,
    Institution(i64),
}

/// Represents the 'student_rankings' table in the database: one row per
/// student, never deleted while the student exists.
///
/// The real-time path writes the stats snapshot and `ranking_score`; the
/// batch path writes the per-scope position/percentile columns. The two
/// writers touch disjoint field subsets.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentRankingRecord {
    pub student_id: i64,

    /// Denormalized from the student row so scope queries need no join.
    pub institution_id: Option<i64>,

    // Overall stats snapshot.
    pub total_quizzes: i64,
    pub average_score: f64,
    pub highest_score: i32,
    pub total_points: i64,

    // Badge snapshot.
    pub badge_count: i64,
    pub badge_points: i64,

    // Streak snapshot.
    pub current_streak: i64,
    pub longest_streak: i64,

    /// The composite score, rounded to an integer in [0, 100].
    pub ranking_score: i32,

    // Global standing, assigned by the batch path.
    pub global_position: Option<i32>,
    pub global_percentile: Option<i32>,
    pub global_updated_at: Option<chrono::DateTime<chrono::Utc>>,

    // Institutional standing, assigned by the batch path.
    pub institution_position: Option<i32>,
    pub institution_percentile: Option<i32>,
    pub institution_updated_at: Option<chrono::DateTime<chrono::Utc>>,

    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The fields the real-time recompute path writes. Positions and
/// percentiles are left alone; only the batch path assigns those.
#[derive(Debug, Clone)]
pub struct RankingSnapshot {
    pub student_id: i64,
    pub institution_id: Option<i64>,
    pub total_quizzes: i64,
    pub average_score: f64,
    pub highest_score: i32,
    pub total_points: i64,
    pub badge_count: i64,
    pub badge_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub ranking_score: i32,
}

/// Projection of a student's current ranking, with the display name joined.
#[derive(Debug, Serialize)]
pub struct RankingView {
    pub display_name: String,
    #[serde(flatten)]
    pub record: StudentRankingRecord,
}

/// Query string of `GET /api/leaderboard`.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// "global" (default) or "institutional".
    pub scope: Option<String>,
    pub institution_id: Option<i64>,
    pub limit: Option<i64>,

    /// When set, the response carries this student's own standing even if
    /// they are outside the returned top set.
    pub student_id: Option<i64>,
}

/// Display-safe leaderboard row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaderboardEntry {
    pub student_id: i64,
    pub display_name: String,
    pub ranking_score: i32,
    pub position: Option<i32>,
    pub percentile: Option<i32>,
    pub badge_count: i64,
    pub current_streak: i64,
    pub average_score: f64,
}

/// Response of `GET /api/leaderboard`.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,

    /// The requesting student's own standing when they did not make the
    /// top set. Rendered as "you are #N" outside the main list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_position: Option<LeaderboardEntry>,
}
