// src/store/postgres.rs

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptOutcome, AttemptRecord, QuizAttempt, status},
        badge::{BadgeDefinition, BadgeTotals, CreateBadgeRequest, NewAward, StudentBadgeAward},
        quiz::{CreateQuizRequest, Quiz},
        ranking::{LeaderboardEntry, RankScope, RankingSnapshot, StudentRankingRecord},
        student::{CreateStudentRequest, Student},
    },
    store::{InsertOutcome, Store},
};

const ATTEMPT_COLUMNS: &str = "id, student_id, quiz_id, answers, raw_score, percentage, passed, \
                               status, started_at, finished_at, total_time_spent, timed_out";

const RANKING_COLUMNS: &str = "student_id, institution_id, total_quizzes, average_score, \
                               highest_score, total_points, badge_count, badge_points, \
                               current_streak, longest_streak, ranking_score, \
                               global_position, global_percentile, global_updated_at, \
                               institution_position, institution_percentile, \
                               institution_updated_at, updated_at";

/// Postgres-backed store. Queries are runtime-checked (`query_as` + binds)
/// against the schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_student(&self, req: &CreateStudentRequest) -> Result<Student, AppError> {
        let student = sqlx::query_as::<_, Student>(
            "INSERT INTO students (display_name, institution_id) VALUES ($1, $2) \
             RETURNING id, display_name, institution_id, created_at",
        )
        .bind(&req.display_name)
        .bind(req.institution_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(student)
    }

    async fn get_student(&self, id: i64) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT id, display_name, institution_id, created_at FROM students WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<Quiz, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            "INSERT INTO quizzes (module_id, title, passing_score, questions) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, module_id, title, passing_score, questions, created_at",
        )
        .bind(req.module_id)
        .bind(&req.title)
        .bind(req.passing_score)
        .bind(Json(&req.questions))
        .fetch_one(&self.pool)
        .await?;
        Ok(quiz)
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            "SELECT id, module_id, title, passing_score, questions, created_at \
             FROM quizzes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quiz)
    }

    async fn create_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<QuizAttempt, AppError> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            "INSERT INTO quiz_attempts (student_id, quiz_id) VALUES ($1, $2) \
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(student_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn get_attempt(&self, id: i64) -> Result<Option<QuizAttempt>, AppError> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn finalize_attempt(
        &self,
        id: i64,
        outcome: &AttemptOutcome,
    ) -> Result<QuizAttempt, AppError> {
        // The status guard makes the write race-safe: only one submission
        // can move an attempt out of in_progress.
        let updated = sqlx::query_as::<_, QuizAttempt>(&format!(
            "UPDATE quiz_attempts \
             SET answers = $2, raw_score = $3, percentage = $4, passed = $5, status = $6, \
                 total_time_spent = $7, timed_out = $8, finished_at = now() \
             WHERE id = $1 AND status = '{}' \
             RETURNING {ATTEMPT_COLUMNS}",
            status::IN_PROGRESS
        ))
        .bind(id)
        .bind(Json(&outcome.answers))
        .bind(outcome.raw_score)
        .bind(outcome.percentage)
        .bind(outcome.passed)
        .bind(&outcome.status)
        .bind(outcome.total_time_spent)
        .bind(outcome.timed_out)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(attempt) => Ok(attempt),
            None => match self.get_attempt(id).await? {
                Some(_) => Err(AppError::Conflict(
                    "Attempt has already been finalized".to_string(),
                )),
                None => Err(AppError::NotFound("Attempt not found".to_string())),
            },
        }
    }

    async fn attempts_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        let records = sqlx::query_as::<_, AttemptRecord>(
            "SELECT a.percentage, a.passed, a.raw_score, a.total_time_spent, \
                    q.module_id, a.started_at \
             FROM quiz_attempts a \
             JOIN quizzes q ON a.quiz_id = q.id \
             WHERE a.student_id = $1 AND a.status = $2 \
             ORDER BY a.started_at ASC",
        )
        .bind(student_id)
        .bind(status::SUBMITTED)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| match e {
            // Malformed attempt rows are an aggregation problem, recovered
            // upstream with zeroed stats; anything else is a storage fault.
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                AppError::Aggregation(e.to_string())
            }
            other => AppError::Persistence(other.to_string()),
        })?;
        Ok(records)
    }

    async fn create_badge(&self, req: &CreateBadgeRequest) -> Result<BadgeDefinition, AppError> {
        let badge = sqlx::query_as::<_, BadgeDefinition>(
            "INSERT INTO badge_definitions (name, description, points, active, criteria) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, description, points, active, criteria, created_at",
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.points)
        .bind(req.active)
        .bind(Json(&req.criteria))
        .fetch_one(&self.pool)
        .await?;
        Ok(badge)
    }

    async fn list_active_badges(&self) -> Result<Vec<BadgeDefinition>, AppError> {
        let badges = sqlx::query_as::<_, BadgeDefinition>(
            "SELECT id, name, description, points, active, criteria, created_at \
             FROM badge_definitions WHERE active ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(badges)
    }

    async fn awarded_badge_ids(&self, student_id: i64) -> Result<HashSet<i64>, AppError> {
        let ids: Vec<(i64,)> =
            sqlx::query_as("SELECT badge_id FROM student_badge_awards WHERE student_id = $1")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_award(&self, award: &NewAward) -> Result<InsertOutcome, AppError> {
        // The unique index on (student_id, badge_id) is the authority;
        // ON CONFLICT DO NOTHING turns the duplicate into a typed outcome.
        let result = sqlx::query(
            "INSERT INTO student_badge_awards \
             (student_id, badge_id, attempt_id, score_achieved, time_spent, streak_at_award) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (student_id, badge_id) DO NOTHING",
        )
        .bind(award.student_id)
        .bind(award.badge_id)
        .bind(award.attempt_id)
        .bind(award.score_achieved)
        .bind(award.time_spent)
        .bind(award.streak_at_award)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyAwarded)
        }
    }

    async fn awards_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentBadgeAward>, AppError> {
        let awards = sqlx::query_as::<_, StudentBadgeAward>(
            "SELECT id, student_id, badge_id, attempt_id, awarded_at, \
                    score_achieved, time_spent, streak_at_award \
             FROM student_badge_awards WHERE student_id = $1 ORDER BY awarded_at ASC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(awards)
    }

    async fn badge_totals(&self, student_id: i64) -> Result<BadgeTotals, AppError> {
        let totals = sqlx::query_as::<_, BadgeTotals>(
            "SELECT COUNT(*) AS count, COALESCE(SUM(b.points), 0)::BIGINT AS points \
             FROM student_badge_awards a \
             JOIN badge_definitions b ON a.badge_id = b.id \
             WHERE a.student_id = $1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    async fn upsert_ranking_snapshot(&self, snapshot: &RankingSnapshot) -> Result<(), AppError> {
        // Only the real-time fields; the batch-owned position/percentile
        // columns are never touched here.
        sqlx::query(
            "INSERT INTO student_rankings \
             (student_id, institution_id, total_quizzes, average_score, highest_score, \
              total_points, badge_count, badge_points, current_streak, longest_streak, \
              ranking_score, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now()) \
             ON CONFLICT (student_id) DO UPDATE SET \
                 institution_id = EXCLUDED.institution_id, \
                 total_quizzes = EXCLUDED.total_quizzes, \
                 average_score = EXCLUDED.average_score, \
                 highest_score = EXCLUDED.highest_score, \
                 total_points = EXCLUDED.total_points, \
                 badge_count = EXCLUDED.badge_count, \
                 badge_points = EXCLUDED.badge_points, \
                 current_streak = EXCLUDED.current_streak, \
                 longest_streak = EXCLUDED.longest_streak, \
                 ranking_score = EXCLUDED.ranking_score, \
                 updated_at = now()",
        )
        .bind(snapshot.student_id)
        .bind(snapshot.institution_id)
        .bind(snapshot.total_quizzes)
        .bind(snapshot.average_score)
        .bind(snapshot.highest_score)
        .bind(snapshot.total_points)
        .bind(snapshot.badge_count)
        .bind(snapshot.badge_points)
        .bind(snapshot.current_streak)
        .bind(snapshot.longest_streak)
        .bind(snapshot.ranking_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_ranking(
        &self,
        student_id: i64,
    ) -> Result<Option<StudentRankingRecord>, AppError> {
        let record = sqlx::query_as::<_, StudentRankingRecord>(&format!(
            "SELECT {RANKING_COLUMNS} FROM student_rankings WHERE student_id = $1"
        ))
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn rankings_in_scope(
        &self,
        scope: RankScope,
    ) -> Result<Vec<StudentRankingRecord>, AppError> {
        let records = match scope {
            RankScope::Global => {
                sqlx::query_as::<_, StudentRankingRecord>(&format!(
                    "SELECT {RANKING_COLUMNS} FROM student_rankings"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            RankScope::Institution(institution_id) => {
                sqlx::query_as::<_, StudentRankingRecord>(&format!(
                    "SELECT {RANKING_COLUMNS} FROM student_rankings WHERE institution_id = $1"
                ))
                .bind(institution_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(records)
    }

    async fn update_scope_position(
        &self,
        student_id: i64,
        scope: RankScope,
        position: i32,
        percentile: i32,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), AppError> {
        match scope {
            RankScope::Global => {
                sqlx::query(
                    "UPDATE student_rankings \
                     SET global_position = $2, global_percentile = $3, global_updated_at = $4 \
                     WHERE student_id = $1",
                )
                .bind(student_id)
                .bind(position)
                .bind(percentile)
                .bind(at)
                .execute(&self.pool)
                .await?;
            }
            RankScope::Institution(_) => {
                sqlx::query(
                    "UPDATE student_rankings \
                     SET institution_position = $2, institution_percentile = $3, \
                         institution_updated_at = $4 \
                     WHERE student_id = $1",
                )
                .bind(student_id)
                .bind(position)
                .bind(percentile)
                .bind(at)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn top_rankings(
        &self,
        scope: RankScope,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let entries = match scope {
            RankScope::Global => {
                sqlx::query_as::<_, LeaderboardEntry>(
                    "SELECT r.student_id, s.display_name, r.ranking_score, \
                            r.global_position AS position, r.global_percentile AS percentile, \
                            r.badge_count, r.current_streak, r.average_score \
                     FROM student_rankings r \
                     JOIN students s ON r.student_id = s.id \
                     ORDER BY r.ranking_score DESC, r.student_id ASC \
                     LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            RankScope::Institution(institution_id) => {
                sqlx::query_as::<_, LeaderboardEntry>(
                    "SELECT r.student_id, s.display_name, r.ranking_score, \
                            r.institution_position AS position, \
                            r.institution_percentile AS percentile, \
                            r.badge_count, r.current_streak, r.average_score \
                     FROM student_rankings r \
                     JOIN students s ON r.student_id = s.id \
                     WHERE r.institution_id = $2 \
                     ORDER BY r.ranking_score DESC, r.student_id ASC \
                     LIMIT $1",
                )
                .bind(limit)
                .bind(institution_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(entries)
    }

    async fn ranking_entry(
        &self,
        student_id: i64,
        scope: RankScope,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        let entry = match scope {
            RankScope::Global => {
                sqlx::query_as::<_, LeaderboardEntry>(
                    "SELECT r.student_id, s.display_name, r.ranking_score, \
                            r.global_position AS position, r.global_percentile AS percentile, \
                            r.badge_count, r.current_streak, r.average_score \
                     FROM student_rankings r \
                     JOIN students s ON r.student_id = s.id \
                     WHERE r.student_id = $1",
                )
                .bind(student_id)
                .fetch_optional(&self.pool)
                .await?
            }
            RankScope::Institution(institution_id) => {
                sqlx::query_as::<_, LeaderboardEntry>(
                    "SELECT r.student_id, s.display_name, r.ranking_score, \
                            r.institution_position AS position, \
                            r.institution_percentile AS percentile, \
                            r.badge_count, r.current_streak, r.average_score \
                     FROM student_rankings r \
                     JOIN students s ON r.student_id = s.id \
                     WHERE r.student_id = $1 AND r.institution_id = $2",
                )
                .bind(student_id)
                .bind(institution_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(entry)
    }
}
