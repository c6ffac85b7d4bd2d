// src/engine/stats.rs

use std::collections::HashSet;

use serde::Serialize;

use crate::models::attempt::AttemptRecord;

/// Cumulative statistics derived from a student's submitted attempts.
///
/// Never persisted as source-of-truth: always recomputed from the attempt
/// history, so two aggregations over the same history are identical.
/// `fastest_time` is `None` when no attempt recorded a positive time, which
/// downstream comparisons must not confuse with a zero-second attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentStats {
    pub total_quizzes: i64,
    pub highest_score: i32,
    pub average_score: f64,
    pub fastest_time: Option<i64>,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub unique_modules: i64,
    pub has_perfect_score: bool,

    /// Count of attempts scoring exactly 100%.
    pub perfect_scores: i64,

    /// Longest contiguous run of 100% scores.
    pub consecutive_perfect_scores: i64,
    pub total_points: i64,

    /// Mean seconds per attempt, over attempts with a positive time.
    pub average_time_per_quiz: Option<f64>,

    /// Distinct UTC dates with at least one submitted attempt.
    pub active_days: i64,
}

/// Pure aggregation over an attempt history. Callers pass only attempts
/// with status `submitted`; ordering of the input does not matter.
pub fn aggregate(attempts: &[AttemptRecord]) -> StudentStats {
    if attempts.is_empty() {
        return StudentStats::default();
    }

    let mut ordered: Vec<&AttemptRecord> = attempts.iter().collect();
    ordered.sort_by_key(|a| a.started_at);

    let total = ordered.len() as i64;
    let mut highest = 0i32;
    let mut percentage_sum = 0f64;
    let mut total_points = 0i64;
    let mut fastest: Option<i64> = None;
    let mut timed_sum = 0i64;
    let mut timed_count = 0i64;
    let mut modules: HashSet<i64> = HashSet::new();
    let mut days: HashSet<chrono::NaiveDate> = HashSet::new();

    let mut pass_run = 0i64;
    let mut longest_streak = 0i64;
    let mut perfect_run = 0i64;
    let mut longest_perfect_run = 0i64;
    let mut perfect_scores = 0i64;

    for a in &ordered {
        highest = highest.max(a.percentage);
        percentage_sum += a.percentage as f64;
        total_points += a.raw_score as i64;
        modules.insert(a.module_id);
        days.insert(a.started_at.date_naive());

        if a.total_time_spent > 0 {
            fastest = Some(match fastest {
                Some(f) => f.min(a.total_time_spent),
                None => a.total_time_spent,
            });
            timed_sum += a.total_time_spent;
            timed_count += 1;
        }

        if a.passed {
            pass_run += 1;
            longest_streak = longest_streak.max(pass_run);
        } else {
            pass_run = 0;
        }

        if a.percentage >= 100 {
            perfect_scores += 1;
            perfect_run += 1;
            longest_perfect_run = longest_perfect_run.max(perfect_run);
        } else {
            perfect_run = 0;
        }
    }

    // Current streak: consecutive passes counted backward from the most
    // recent attempt; a most-recent failure means streak zero.
    let current_streak = ordered.iter().rev().take_while(|a| a.passed).count() as i64;

    StudentStats {
        total_quizzes: total,
        highest_score: highest,
        average_score: percentage_sum / total as f64,
        fastest_time: fastest,
        current_streak,
        longest_streak,
        unique_modules: modules.len() as i64,
        has_perfect_score: perfect_scores > 0,
        perfect_scores,
        consecutive_perfect_scores: longest_perfect_run,
        total_points,
        average_time_per_quiz: if timed_count > 0 {
            Some(timed_sum as f64 / timed_count as f64)
        } else {
            None
        },
        active_days: days.len() as i64,
    }
}
