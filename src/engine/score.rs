// src/engine/score.rs

use crate::models::{attempt::AttemptAnswer, quiz::Quiz};

/// The computed triple for one attempt. Persisting it is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradedScore {
    pub raw: i32,
    pub percentage: i32,
    pub passed: bool,
}

/// Converts graded per-question answers into a percentage score and
/// pass/fail flag against the quiz's point schema.
///
/// A quiz whose schema sums to zero points yields 0%, never a division
/// error. Resolution of the quiz itself happens upstream; a missing quiz is
/// a `NotFound`, not a silent zero.
pub fn compute_score(answers: &[AttemptAnswer], quiz: &Quiz) -> GradedScore {
    let raw: i32 = answers.iter().map(|a| a.points_earned).sum();
    let total = quiz.total_points();

    let percentage = if total <= 0 {
        0
    } else {
        ((raw as f64 / total as f64) * 100.0).round() as i32
    }
    .clamp(0, 100);

    GradedScore {
        raw,
        percentage,
        passed: percentage >= quiz.passing_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::QuizQuestion;
    use sqlx::types::Json;

    fn quiz(passing_score: i32, points: &[i32]) -> Quiz {
        Quiz {
            id: 1,
            module_id: 1,
            title: "t".to_string(),
            passing_score,
            questions: Json(
                points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| QuizQuestion {
                        id: i as i64 + 1,
                        points: *p,
                    })
                    .collect(),
            ),
            created_at: None,
        }
    }

    fn answers(earned: &[i32]) -> Vec<AttemptAnswer> {
        earned
            .iter()
            .enumerate()
            .map(|(i, p)| AttemptAnswer {
                question_id: i as i64 + 1,
                points_earned: *p,
            })
            .collect()
    }

    #[test]
    fn full_marks() {
        let q = quiz(60, &[10, 10, 10]);
        let s = compute_score(&answers(&[10, 10, 10]), &q);
        assert_eq!(s.raw, 30);
        assert_eq!(s.percentage, 100);
        assert!(s.passed);
    }

    #[test]
    fn rounds_to_nearest_percent() {
        // 2 of 3 ten-point questions: 66.67% rounds to 67.
        let q = quiz(60, &[10, 10, 10]);
        let s = compute_score(&answers(&[10, 10, 0]), &q);
        assert_eq!(s.percentage, 67);
        assert!(s.passed);
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        let q = quiz(60, &[10, 10, 10, 10, 10]);
        let s = compute_score(&answers(&[10, 10, 10, 0, 0]), &q);
        assert_eq!(s.percentage, 60);
        assert!(s.passed);
    }

    #[test]
    fn below_threshold_fails() {
        let q = quiz(60, &[10, 10]);
        let s = compute_score(&answers(&[10, 0]), &q);
        assert_eq!(s.percentage, 50);
        assert!(!s.passed);
    }

    #[test]
    fn zero_total_points_scores_zero() {
        let q = quiz(60, &[0, 0]);
        let s = compute_score(&answers(&[0, 0]), &q);
        assert_eq!(s.raw, 0);
        assert_eq!(s.percentage, 0);
        assert!(!s.passed);
    }

    #[test]
    fn no_answers_scores_zero() {
        let q = quiz(0, &[10]);
        let s = compute_score(&[], &q);
        assert_eq!(s.raw, 0);
        assert_eq!(s.percentage, 0);
        // Passing score of 0 means even an empty submission passes.
        assert!(s.passed);
    }
}
