// src/models/badge.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Criteria of a badge definition. Every field is optional; all fields that
/// are present must hold for a match (logical AND). A criteria object with
/// no fields present matches unconditionally and is reserved for manually
/// granted badges — automatic evaluation gates those separately.
///
/// Kept as a typed struct (not a dynamic key/value bag) so the AND-matching
/// logic is exhaustively enumerable and checked by the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeCriteria {
    /// Minimum number of completed quizzes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_count: Option<i64>,

    /// Minimum highest score (percentage).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<i32>,

    /// Maximum fastest completion time, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_time: Option<i64>,

    /// Minimum current pass streak.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_count: Option<i64>,

    /// Minimum count of distinct modules attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_count: Option<i64>,

    /// Requires at least one 100% score when true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perfect_score: Option<bool>,

    /// Minimum run of consecutive 100% scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consecutive_perfect: Option<i64>,
}

/// Represents the 'badge_definitions' table in the database.
///
/// Immutable once referenced by an award: editing criteria never revokes
/// awards already granted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,

    /// Points this badge contributes to the ranking formula.
    pub points: i32,
    pub active: bool,
    pub criteria: Json<BadgeCriteria>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'student_badge_awards' table in the database.
/// At most one row per (student, badge) pair, enforced by a unique index.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentBadgeAward {
    pub id: i64,
    pub student_id: i64,
    pub badge_id: i64,

    /// The attempt that triggered the award, when there was one.
    pub attempt_id: Option<i64>,
    pub awarded_at: chrono::DateTime<chrono::Utc>,

    // Contextual metadata captured at award time.
    pub score_achieved: Option<i32>,
    pub time_spent: Option<i64>,
    pub streak_at_award: Option<i64>,
}

/// Fields of an award before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAward {
    pub student_id: i64,
    pub badge_id: i64,
    pub attempt_id: Option<i64>,
    pub score_achieved: Option<i32>,
    pub time_spent: Option<i64>,
    pub streak_at_award: Option<i64>,
}

/// Display view of a newly earned badge, returned from a submission.
#[derive(Debug, Clone, Serialize)]
pub struct AwardedBadge {
    pub badge_id: i64,
    pub name: String,
    pub points: i32,
}

/// Badge award aggregates feeding the ranking formula.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct BadgeTotals {
    pub count: i64,
    pub points: i64,
}

/// DTO for creating a badge definition.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBadgeRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1000))]
    pub points: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub criteria: BadgeCriteria,
}

fn default_active() -> bool {
    true
}
