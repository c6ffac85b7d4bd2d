// src/engine/ranking.rs

use std::time::Duration;

use chrono::Utc;

use crate::{
    config::{
        RANK_WRITE_ATTEMPTS, WEIGHT_ACTIVE_DAYS, WEIGHT_AVG_SCORE, WEIGHT_BADGE_COUNT,
        WEIGHT_BADGE_POINTS, WEIGHT_PERFECT, WEIGHT_SPEED, WEIGHT_STREAK,
    },
    engine::stats::{self, StudentStats},
    error::AppError,
    models::ranking::{RankScope, RankingSnapshot, StudentRankingRecord},
    store::Store,
};

/// Everything the composite formula consumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingInputs {
    pub average_score: f64,
    pub badge_count: i64,
    pub badge_points: i64,
    pub current_streak: i64,
    pub perfect_scores: i64,
    pub average_time_per_quiz: Option<f64>,
    pub active_days: i64,
}

/// The fixed weighted sum. Each component is capped into [0, 100] before
/// weighting, so the rounded result stays within [0, 100] for any input.
pub fn ranking_score(inputs: &RankingInputs) -> i32 {
    let avg = inputs.average_score.clamp(0.0, 100.0);
    let badges = (inputs.badge_count as f64 * 4.0).clamp(0.0, 100.0);
    let badge_points = (inputs.badge_points as f64 / 10.0).clamp(0.0, 100.0);
    let streak = (inputs.current_streak as f64 * 10.0).clamp(0.0, 100.0);
    let perfect = (inputs.perfect_scores as f64 * 20.0).clamp(0.0, 100.0);
    let speed = match inputs.average_time_per_quiz {
        Some(avg_secs) => (100.0 - avg_secs / 60.0).clamp(0.0, 100.0),
        None => 0.0,
    };
    let active = (inputs.active_days as f64 * 2.0).clamp(0.0, 100.0);

    (avg * WEIGHT_AVG_SCORE
        + badges * WEIGHT_BADGE_COUNT
        + badge_points * WEIGHT_BADGE_POINTS
        + streak * WEIGHT_STREAK
        + perfect * WEIGHT_PERFECT
        + speed * WEIGHT_SPEED
        + active * WEIGHT_ACTIVE_DAYS)
        .round() as i32
}

/// A scoped position/percentile assignment for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankAssignment {
    pub student_id: i64,
    pub position: i32,
    pub percentile: i32,
}

/// Sorts (student_id, score) pairs descending by score with ascending
/// student-id tie-break and assigns positions and percentiles. Deterministic
/// for equal scores; an empty scope yields no assignments.
pub fn assign_positions(mut scored: Vec<(i64, i32)>) -> Vec<RankAssignment> {
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let total = scored.len();
    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (student_id, _))| RankAssignment {
            student_id,
            position: (idx + 1) as i32,
            percentile: (((total - idx) as f64 / total as f64) * 100.0).round() as i32,
        })
        .collect()
}

/// Real-time path: recomputes one student's stats, badge totals and
/// composite score from scratch and upserts the snapshot fields of their
/// ranking record. Idempotent given the same attempt history; position and
/// percentile are left to the batch path.
pub async fn recompute_student(
    store: &dyn Store,
    student_id: i64,
) -> Result<StudentRankingRecord, AppError> {
    let student = store
        .get_student(student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    // Malformed attempt data degrades to zeroed stats for this student so
    // ranking keeps working for everyone else.
    let stats = match store.attempts_for_student(student_id).await {
        Ok(attempts) => stats::aggregate(&attempts),
        Err(e) => {
            tracing::warn!(student_id, error = %e, "stats aggregation failed, using zeroed stats");
            StudentStats::default()
        }
    };

    let badge_totals = store.badge_totals(student_id).await?;

    let score = ranking_score(&RankingInputs {
        average_score: stats.average_score,
        badge_count: badge_totals.count,
        badge_points: badge_totals.points,
        current_streak: stats.current_streak,
        perfect_scores: stats.perfect_scores,
        average_time_per_quiz: stats.average_time_per_quiz,
        active_days: stats.active_days,
    });

    let snapshot = RankingSnapshot {
        student_id,
        institution_id: student.institution_id,
        total_quizzes: stats.total_quizzes,
        average_score: stats.average_score,
        highest_score: stats.highest_score,
        total_points: stats.total_points,
        badge_count: badge_totals.count,
        badge_points: badge_totals.points,
        current_streak: stats.current_streak,
        longest_streak: stats.longest_streak,
        ranking_score: score,
    };
    store.upsert_ranking_snapshot(&snapshot).await?;

    store
        .get_ranking(student_id)
        .await?
        .ok_or_else(|| AppError::Persistence("ranking record missing after upsert".to_string()))
}

/// Batch path: assigns positions and percentiles across every ranking
/// record in the scope. A record whose write keeps failing after bounded
/// retries is skipped; the rest of the batch continues. Returns the number
/// of records updated. An empty scope is not an error.
pub async fn recompute_scope(store: &dyn Store, scope: RankScope) -> Result<u64, AppError> {
    let records = store.rankings_in_scope(scope).await?;
    if records.is_empty() {
        return Ok(0);
    }

    let scored: Vec<(i64, i32)> = records
        .iter()
        .map(|r| (r.student_id, r.ranking_score))
        .collect();
    let assignments = assign_positions(scored);

    let now = Utc::now();
    let mut updated = 0u64;
    for a in assignments {
        match persist_with_retry(store, a, scope, now).await {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::error!(student_id = a.student_id, error = %e, "rank update skipped");
            }
        }
    }

    tracing::info!(?scope, updated, "rank assignment pass finished");
    Ok(updated)
}

async fn persist_with_retry(
    store: &dyn Store,
    assignment: RankAssignment,
    scope: RankScope,
    at: chrono::DateTime<Utc>,
) -> Result<(), AppError> {
    let mut attempt = 0u32;
    loop {
        match store
            .update_scope_position(
                assignment.student_id,
                scope,
                assignment.position,
                assignment.percentile,
                at,
            )
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 < RANK_WRITE_ATTEMPTS => {
                attempt += 1;
                tracing::warn!(
                    student_id = assignment.student_id,
                    attempt,
                    error = %e,
                    "rank write failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;

    #[test]
    fn weights_sum_to_one() {
        let sum = WEIGHT_AVG_SCORE
            + WEIGHT_BADGE_COUNT
            + WEIGHT_BADGE_POINTS
            + WEIGHT_STREAK
            + WEIGHT_PERFECT
            + WEIGHT_SPEED
            + WEIGHT_ACTIVE_DAYS;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn score_stays_within_bounds_for_extreme_inputs() {
        let maxed = RankingInputs {
            average_score: 100.0,
            badge_count: 10_000,
            badge_points: 1_000_000,
            current_streak: 10_000,
            perfect_scores: 10_000,
            average_time_per_quiz: Some(0.0),
            active_days: 10_000,
        };
        assert_eq!(ranking_score(&maxed), 100);

        assert_eq!(ranking_score(&RankingInputs::default()), 0);

        let slow = RankingInputs {
            average_score: 100.0,
            // Two hours per quiz: speed bonus floors at 0, never negative.
            average_time_per_quiz: Some(7200.0),
            ..Default::default()
        };
        let score = ranking_score(&slow);
        assert!((0..=100).contains(&score));
        assert_eq!(score, 35);
    }

    #[test]
    fn recompute_is_deterministic() {
        let inputs = RankingInputs {
            average_score: 82.5,
            badge_count: 7,
            badge_points: 350,
            current_streak: 4,
            perfect_scores: 2,
            average_time_per_quiz: Some(420.0),
            active_days: 12,
        };
        assert_eq!(ranking_score(&inputs), ranking_score(&inputs));
    }

    #[test]
    fn untimed_students_get_no_speed_bonus() {
        let timed = RankingInputs {
            average_score: 80.0,
            average_time_per_quiz: Some(60.0),
            ..Default::default()
        };
        let untimed = RankingInputs {
            average_time_per_quiz: None,
            ..timed
        };
        assert!(ranking_score(&timed) > ranking_score(&untimed));
    }

    #[test]
    fn positions_and_percentiles_with_tie_break() {
        // Scores [80, 95, 95]; ties broken by ascending student id.
        let assignments = assign_positions(vec![(30, 80), (20, 95), (10, 95)]);
        assert_eq!(
            assignments,
            vec![
                RankAssignment {
                    student_id: 10,
                    position: 1,
                    percentile: 100
                },
                RankAssignment {
                    student_id: 20,
                    position: 2,
                    percentile: 67
                },
                RankAssignment {
                    student_id: 30,
                    position: 3,
                    percentile: 33
                },
            ]
        );
    }

    #[test]
    fn assignment_order_is_stable_across_runs() {
        let input = vec![(5, 70), (3, 70), (9, 70), (1, 90)];
        assert_eq!(assign_positions(input.clone()), assign_positions(input));
    }

    #[test]
    fn percentiles_never_increase_with_position() {
        let assignments = assign_positions((1..=37).map(|id| (id, (id * 7 % 50) as i32)).collect());
        for pair in assignments.windows(2) {
            assert!(pair[0].position < pair[1].position);
            assert!(pair[0].percentile >= pair[1].percentile);
        }
    }

    #[test]
    fn empty_scope_assigns_nothing() {
        assert!(assign_positions(Vec::new()).is_empty());
    }
}
