// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::badge::AwardedBadge;

/// Attempt lifecycle states, stored as TEXT.
pub mod status {
    pub const IN_PROGRESS: &str = "in_progress";
    pub const SUBMITTED: &str = "submitted";
    pub const TIMED_OUT: &str = "timed_out";
}

/// One already-graded answer, as delivered by the quiz-taking subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub question_id: i64,
    pub points_earned: i32,
}

/// Represents the 'quiz_attempts' table in the database.
///
/// Created on quiz start with status `in_progress`, mutated exactly once on
/// submission, immutable thereafter. Owned by the student who created it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub answers: Json<Vec<AttemptAnswer>>,
    pub raw_score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Total seconds spent, reported by the client runtime.
    pub total_time_spent: i64,
    pub timed_out: bool,
}

/// Minimal attempt projection the stats aggregator consumes.
/// Joined with the quiz's module id; only `submitted` attempts qualify.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRecord {
    pub percentage: i32,
    pub passed: bool,
    pub raw_score: i32,
    pub total_time_spent: i64,
    pub module_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    pub student_id: i64,
    pub quiz_id: i64,
}

/// DTO for submitting a graded attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<AttemptAnswer>,
    #[validate(range(min = 0))]
    pub total_time_spent: i64,
    #[serde(default)]
    pub timed_out: bool,
}

/// The finalized fields written to an attempt on submission.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub answers: Vec<AttemptAnswer>,
    pub raw_score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub status: String,
    pub total_time_spent: i64,
    pub timed_out: bool,
}

/// Synchronous result of a submission: the score plus whatever badges this
/// attempt newly earned. Follow-up failures never suppress the score.
#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub attempt_id: i64,
    pub raw_score: i32,
    pub percentage: i32,
    pub passed: bool,
    pub newly_awarded_badges: Vec<AwardedBadge>,
}
