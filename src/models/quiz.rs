// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// One entry of a quiz's point schema. The engine never sees question
/// content or correct answers; grading happens upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub points: i32,
}

/// Represents the 'quizzes' table in the database.
///
/// This is the interface boundary with the content subsystem: the engine
/// only needs the point schema, the passing threshold and the module the
/// quiz belongs to (for module-diversity stats).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub module_id: i64,
    pub title: String,

    /// Minimum percentage required to pass.
    pub passing_score: i32,

    /// Point schema, stored as a JSON array.
    pub questions: Json<Vec<QuizQuestion>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Quiz {
    /// Sum of points across the question schema.
    pub fn total_points(&self) -> i32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub module_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i32,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<QuizQuestion>,
}

fn validate_questions(questions: &[QuizQuestion]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.points < 0 {
            return Err(validator::ValidationError::new("points_cannot_be_negative"));
        }
    }
    Ok(())
}
