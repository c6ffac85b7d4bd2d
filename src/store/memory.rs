// src/store/memory.rs

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

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

/// In-memory store mirroring [`super::PgStore`] semantics, used by the test
/// suite and for database-less local runs.
///
/// All mutations go through one write lock, so the (student, badge)
/// uniqueness check-and-insert in `insert_award` is atomic, matching the
/// unique-index guarantee of the Postgres implementation.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    students: HashMap<i64, Student>,
    quizzes: HashMap<i64, Quiz>,
    attempts: HashMap<i64, QuizAttempt>,
    badges: HashMap<i64, BadgeDefinition>,
    awards: Vec<StudentBadgeAward>,
    award_keys: HashSet<(i64, i64)>,
    rankings: HashMap<i64, StudentRankingRecord>,
    next_student_id: i64,
    next_quiz_id: i64,
    next_attempt_id: i64,
    next_badge_id: i64,
    next_award_id: i64,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

fn entry_from(record: &StudentRankingRecord, name: &str, scope: RankScope) -> LeaderboardEntry {
    let (position, percentile) = match scope {
        RankScope::Global => (record.global_position, record.global_percentile),
        RankScope::Institution(_) => (record.institution_position, record.institution_percentile),
    };
    LeaderboardEntry {
        student_id: record.student_id,
        display_name: name.to_string(),
        ranking_score: record.ranking_score,
        position,
        percentile,
        badge_count: record.badge_count,
        current_streak: record.current_streak,
        average_score: record.average_score,
    }
}

fn in_scope(record: &StudentRankingRecord, scope: RankScope) -> bool {
    match scope {
        RankScope::Global => true,
        RankScope::Institution(id) => record.institution_id == Some(id),
    }
}

#[async_trait]
impl Store for MemStore {
    async fn create_student(&self, req: &CreateStudentRequest) -> Result<Student, AppError> {
        let mut inner = self.inner.write().await;
        let id = next(&mut inner.next_student_id);
        let student = Student {
            id,
            display_name: req.display_name.clone(),
            institution_id: req.institution_id,
            created_at: Some(Utc::now()),
        };
        inner.students.insert(id, student.clone());
        Ok(student)
    }

    async fn get_student(&self, id: i64) -> Result<Option<Student>, AppError> {
        Ok(self.inner.read().await.students.get(&id).cloned())
    }

    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<Quiz, AppError> {
        let mut inner = self.inner.write().await;
        let id = next(&mut inner.next_quiz_id);
        let quiz = Quiz {
            id,
            module_id: req.module_id,
            title: req.title.clone(),
            passing_score: req.passing_score,
            questions: Json(req.questions.clone()),
            created_at: Some(Utc::now()),
        };
        inner.quizzes.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.inner.read().await.quizzes.get(&id).cloned())
    }

    async fn create_attempt(
        &self,
        student_id: i64,
        quiz_id: i64,
    ) -> Result<QuizAttempt, AppError> {
        let mut inner = self.inner.write().await;
        let id = next(&mut inner.next_attempt_id);
        let attempt = QuizAttempt {
            id,
            student_id,
            quiz_id,
            answers: Json(Vec::new()),
            raw_score: 0,
            percentage: 0,
            passed: false,
            status: status::IN_PROGRESS.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            total_time_spent: 0,
            timed_out: false,
        };
        inner.attempts.insert(id, attempt.clone());
        Ok(attempt)
    }

    async fn get_attempt(&self, id: i64) -> Result<Option<QuizAttempt>, AppError> {
        Ok(self.inner.read().await.attempts.get(&id).cloned())
    }

    async fn finalize_attempt(
        &self,
        id: i64,
        outcome: &AttemptOutcome,
    ) -> Result<QuizAttempt, AppError> {
        let mut inner = self.inner.write().await;
        let attempt = inner
            .attempts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        if attempt.status != status::IN_PROGRESS {
            return Err(AppError::Conflict(
                "Attempt has already been finalized".to_string(),
            ));
        }
        attempt.answers = Json(outcome.answers.clone());
        attempt.raw_score = outcome.raw_score;
        attempt.percentage = outcome.percentage;
        attempt.passed = outcome.passed;
        attempt.status = outcome.status.clone();
        attempt.total_time_spent = outcome.total_time_spent;
        attempt.timed_out = outcome.timed_out;
        attempt.finished_at = Some(Utc::now());
        Ok(attempt.clone())
    }

    async fn attempts_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        let inner = self.inner.read().await;
        let mut records: Vec<AttemptRecord> = inner
            .attempts
            .values()
            .filter(|a| a.student_id == student_id && a.status == status::SUBMITTED)
            .filter_map(|a| {
                let quiz = inner.quizzes.get(&a.quiz_id)?;
                Some(AttemptRecord {
                    percentage: a.percentage,
                    passed: a.passed,
                    raw_score: a.raw_score,
                    total_time_spent: a.total_time_spent,
                    module_id: quiz.module_id,
                    started_at: a.started_at,
                })
            })
            .collect();
        records.sort_by_key(|r| r.started_at);
        Ok(records)
    }

    async fn create_badge(&self, req: &CreateBadgeRequest) -> Result<BadgeDefinition, AppError> {
        let mut inner = self.inner.write().await;
        let id = next(&mut inner.next_badge_id);
        let badge = BadgeDefinition {
            id,
            name: req.name.clone(),
            description: req.description.clone(),
            points: req.points,
            active: req.active,
            criteria: Json(req.criteria.clone()),
            created_at: Some(Utc::now()),
        };
        inner.badges.insert(id, badge.clone());
        Ok(badge)
    }

    async fn list_active_badges(&self) -> Result<Vec<BadgeDefinition>, AppError> {
        let inner = self.inner.read().await;
        let mut badges: Vec<BadgeDefinition> =
            inner.badges.values().filter(|b| b.active).cloned().collect();
        badges.sort_by_key(|b| b.id);
        Ok(badges)
    }

    async fn awarded_badge_ids(&self, student_id: i64) -> Result<HashSet<i64>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .award_keys
            .iter()
            .filter(|(sid, _)| *sid == student_id)
            .map(|(_, bid)| *bid)
            .collect())
    }

    async fn insert_award(&self, award: &NewAward) -> Result<InsertOutcome, AppError> {
        let mut inner = self.inner.write().await;
        let key = (award.student_id, award.badge_id);
        if !inner.award_keys.insert(key) {
            return Ok(InsertOutcome::AlreadyAwarded);
        }
        let id = next(&mut inner.next_award_id);
        inner.awards.push(StudentBadgeAward {
            id,
            student_id: award.student_id,
            badge_id: award.badge_id,
            attempt_id: award.attempt_id,
            awarded_at: Utc::now(),
            score_achieved: award.score_achieved,
            time_spent: award.time_spent,
            streak_at_award: award.streak_at_award,
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn awards_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentBadgeAward>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .awards
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn badge_totals(&self, student_id: i64) -> Result<BadgeTotals, AppError> {
        let inner = self.inner.read().await;
        let mut totals = BadgeTotals::default();
        for award in inner.awards.iter().filter(|a| a.student_id == student_id) {
            totals.count += 1;
            if let Some(badge) = inner.badges.get(&award.badge_id) {
                totals.points += badge.points as i64;
            }
        }
        Ok(totals)
    }

    async fn upsert_ranking_snapshot(&self, snapshot: &RankingSnapshot) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let now = Some(Utc::now());
        let record = inner
            .rankings
            .entry(snapshot.student_id)
            .or_insert_with(|| StudentRankingRecord {
                student_id: snapshot.student_id,
                institution_id: None,
                total_quizzes: 0,
                average_score: 0.0,
                highest_score: 0,
                total_points: 0,
                badge_count: 0,
                badge_points: 0,
                current_streak: 0,
                longest_streak: 0,
                ranking_score: 0,
                global_position: None,
                global_percentile: None,
                global_updated_at: None,
                institution_position: None,
                institution_percentile: None,
                institution_updated_at: None,
                updated_at: None,
            });
        // Batch-owned position/percentile fields are preserved.
        record.institution_id = snapshot.institution_id;
        record.total_quizzes = snapshot.total_quizzes;
        record.average_score = snapshot.average_score;
        record.highest_score = snapshot.highest_score;
        record.total_points = snapshot.total_points;
        record.badge_count = snapshot.badge_count;
        record.badge_points = snapshot.badge_points;
        record.current_streak = snapshot.current_streak;
        record.longest_streak = snapshot.longest_streak;
        record.ranking_score = snapshot.ranking_score;
        record.updated_at = now;
        Ok(())
    }

    async fn get_ranking(
        &self,
        student_id: i64,
    ) -> Result<Option<StudentRankingRecord>, AppError> {
        Ok(self.inner.read().await.rankings.get(&student_id).cloned())
    }

    async fn rankings_in_scope(
        &self,
        scope: RankScope,
    ) -> Result<Vec<StudentRankingRecord>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rankings
            .values()
            .filter(|r| in_scope(r, scope))
            .cloned()
            .collect())
    }

    async fn update_scope_position(
        &self,
        student_id: i64,
        scope: RankScope,
        position: i32,
        percentile: i32,
        at: chrono::DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.rankings.get_mut(&student_id) {
            match scope {
                RankScope::Global => {
                    record.global_position = Some(position);
                    record.global_percentile = Some(percentile);
                    record.global_updated_at = Some(at);
                }
                RankScope::Institution(_) => {
                    record.institution_position = Some(position);
                    record.institution_percentile = Some(percentile);
                    record.institution_updated_at = Some(at);
                }
            }
        }
        Ok(())
    }

    async fn top_rankings(
        &self,
        scope: RankScope,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let inner = self.inner.read().await;
        let mut records: Vec<&StudentRankingRecord> = inner
            .rankings
            .values()
            .filter(|r| in_scope(r, scope))
            .collect();
        records.sort_by(|a, b| {
            b.ranking_score
                .cmp(&a.ranking_score)
                .then(a.student_id.cmp(&b.student_id))
        });
        Ok(records
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|r| {
                let name = inner
                    .students
                    .get(&r.student_id)
                    .map(|s| s.display_name.as_str())
                    .unwrap_or("");
                entry_from(r, name, scope)
            })
            .collect())
    }

    async fn ranking_entry(
        &self,
        student_id: i64,
        scope: RankScope,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        let inner = self.inner.read().await;
        let record = match inner.rankings.get(&student_id) {
            Some(r) if in_scope(r, scope) => r,
            _ => return Ok(None),
        };
        let name = inner
            .students
            .get(&student_id)
            .map(|s| s.display_name.as_str())
            .unwrap_or("");
        Ok(Some(entry_from(record, name, scope)))
    }
}
