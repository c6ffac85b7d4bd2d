// src/engine/badges.rs

use crate::{
    engine::stats::StudentStats,
    error::AppError,
    models::badge::{AwardedBadge, BadgeCriteria, NewAward},
    store::{InsertOutcome, Store},
};

impl BadgeCriteria {
    /// True when no criteria field is present. Such definitions match
    /// unconditionally and are reserved for manually granted badges.
    pub fn is_empty(&self) -> bool {
        self.quiz_count.is_none()
            && self.min_score.is_none()
            && self.max_time.is_none()
            && self.streak_count.is_none()
            && self.module_count.is_none()
            && self.perfect_score.is_none()
            && self.consecutive_perfect.is_none()
    }

    /// AND over every present field. An absent field constrains nothing.
    pub fn matches(&self, stats: &StudentStats) -> bool {
        if let Some(n) = self.quiz_count {
            if stats.total_quizzes < n {
                return false;
            }
        }
        if let Some(s) = self.min_score {
            if stats.highest_score < s {
                return false;
            }
        }
        if let Some(t) = self.max_time {
            // An unbounded fastest time (no timed attempts) never satisfies
            // a speed criterion.
            match stats.fastest_time {
                Some(fastest) if fastest <= t => {}
                _ => return false,
            }
        }
        if let Some(n) = self.streak_count {
            if stats.current_streak < n {
                return false;
            }
        }
        if let Some(n) = self.module_count {
            if stats.unique_modules < n {
                return false;
            }
        }
        if self.perfect_score == Some(true) && !stats.has_perfect_score {
            return false;
        }
        if let Some(n) = self.consecutive_perfect {
            if stats.consecutive_perfect_scores < n {
                return false;
            }
        }
        true
    }
}

/// Context captured onto awards triggered by an attempt submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwardContext {
    pub attempt_id: Option<i64>,
    pub score_achieved: Option<i32>,
    pub time_spent: Option<i64>,
}

/// One badge that could not be awarded in this pass. Reported, not fatal:
/// the remaining catalog is still evaluated.
#[derive(Debug)]
pub struct AwardFailure {
    pub badge_id: i64,
    pub reason: String,
}

/// Result of one evaluation pass over the catalog.
#[derive(Debug, Default)]
pub struct Evaluation {
    pub newly_awarded: Vec<AwardedBadge>,
    pub failures: Vec<AwardFailure>,
}

/// Matches the active catalog against `stats` and awards every qualifying
/// badge the student does not already hold.
///
/// Awarding goes through the store's insert-if-absent keyed on
/// (student, badge): a concurrent submission that wins the race produces
/// `AlreadyAwarded`, which is a silent no-op here. Re-running with unchanged
/// stats therefore returns an empty `newly_awarded`.
///
/// Criteria-less definitions only match when `award_unconditional` is set;
/// the automatic submission path never sets it.
pub async fn evaluate(
    store: &dyn Store,
    student_id: i64,
    stats: &StudentStats,
    ctx: &AwardContext,
    award_unconditional: bool,
) -> Result<Evaluation, AppError> {
    let catalog = store.list_active_badges().await?;
    let already_awarded = store.awarded_badge_ids(student_id).await?;

    let mut evaluation = Evaluation::default();

    for definition in catalog {
        if already_awarded.contains(&definition.id) {
            continue;
        }
        if definition.criteria.is_empty() {
            if !award_unconditional {
                continue;
            }
        } else if !definition.criteria.matches(stats) {
            continue;
        }

        let award = NewAward {
            student_id,
            badge_id: definition.id,
            attempt_id: ctx.attempt_id,
            score_achieved: ctx.score_achieved,
            time_spent: ctx.time_spent,
            streak_at_award: Some(stats.current_streak),
        };

        match store.insert_award(&award).await {
            Ok(InsertOutcome::Inserted) => {
                tracing::info!(student_id, badge_id = definition.id, "badge awarded");
                evaluation.newly_awarded.push(AwardedBadge {
                    badge_id: definition.id,
                    name: definition.name.clone(),
                    points: definition.points,
                });
            }
            Ok(InsertOutcome::AlreadyAwarded) => {
                // A concurrent submission got there first. Not an error.
                tracing::debug!(student_id, badge_id = definition.id, "award raced, no-op");
            }
            Err(e) => {
                tracing::warn!(student_id, badge_id = definition.id, error = %e, "badge award failed");
                evaluation.failures.push(AwardFailure {
                    badge_id: definition.id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(evaluation)
}
