// src/store/mod.rs

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptOutcome, AttemptRecord, QuizAttempt},
        badge::{BadgeDefinition, BadgeTotals, NewAward, StudentBadgeAward},
        quiz::{CreateQuizRequest, Quiz},
        ranking::{LeaderboardEntry, RankScope, RankingSnapshot, StudentRankingRecord},
        student::{CreateStudentRequest, Student},
    },
};

/// Outcome of the insert-if-absent award write. Duplicate-key detection is
/// a value, not exception-driven control flow: `AlreadyAwarded` means a
/// concurrent (or earlier) writer holds the (student, badge) pair and the
/// caller treats it as success-no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyAwarded,
}

/// Persistence seam of the engine. The production implementation is
/// [`PgStore`]; [`MemStore`] backs tests and local development.
///
/// The one hard concurrency guarantee lives here: `insert_award` must be
/// atomic on the (student, badge) uniqueness constraint, enforced by the
/// storage layer rather than check-then-insert in application code.
#[async_trait]
pub trait Store: Send + Sync {
    // Students
    async fn create_student(&self, req: &CreateStudentRequest) -> Result<Student, AppError>;
    async fn get_student(&self, id: i64) -> Result<Option<Student>, AppError>;

    // Quizzes (interface boundary with the content subsystem)
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<Quiz, AppError>;
    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;

    // Attempts
    async fn create_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<QuizAttempt, AppError>;
    async fn get_attempt(&self, id: i64) -> Result<Option<QuizAttempt>, AppError>;

    /// Writes the graded outcome onto an `in_progress` attempt. Attempts are
    /// immutable after submission; finalizing twice is a `Conflict`.
    async fn finalize_attempt(
        &self,
        id: i64,
        outcome: &AttemptOutcome,
    ) -> Result<QuizAttempt, AppError>;

    /// A student's `submitted` attempts joined with their quiz's module id,
    /// in no guaranteed order. Input of the stats aggregator.
    async fn attempts_for_student(&self, student_id: i64) -> Result<Vec<AttemptRecord>, AppError>;

    // Badges
    async fn create_badge(
        &self,
        req: &crate::models::badge::CreateBadgeRequest,
    ) -> Result<BadgeDefinition, AppError>;
    async fn list_active_badges(&self) -> Result<Vec<BadgeDefinition>, AppError>;
    async fn awarded_badge_ids(&self, student_id: i64) -> Result<HashSet<i64>, AppError>;
    async fn insert_award(&self, award: &NewAward) -> Result<InsertOutcome, AppError>;
    async fn awards_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentBadgeAward>, AppError>;
    async fn badge_totals(&self, student_id: i64) -> Result<BadgeTotals, AppError>;

    // Rankings
    async fn upsert_ranking_snapshot(&self, snapshot: &RankingSnapshot) -> Result<(), AppError>;
    async fn get_ranking(
        &self,
        student_id: i64,
    ) -> Result<Option<StudentRankingRecord>, AppError>;
    async fn rankings_in_scope(
        &self,
        scope: RankScope,
    ) -> Result<Vec<StudentRankingRecord>, AppError>;
    async fn update_scope_position(
        &self,
        student_id: i64,
        scope: RankScope,
        position: i32,
        percentile: i32,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), AppError>;
    async fn top_rankings(
        &self,
        scope: RankScope,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, AppError>;
    async fn ranking_entry(
        &self,
        student_id: i64,
        scope: RankScope,
    ) -> Result<Option<LeaderboardEntry>, AppError>;
}
