// src/handlers/attempts.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    engine::{
        badges::{self, AwardContext},
        ranking, score, stats,
    },
    error::AppError,
    models::{
        attempt::{
            AttemptOutcome, QuizAttempt, StartAttemptRequest, SubmitAttemptRequest,
            SubmitAttemptResponse, status,
        },
        badge::AwardedBadge,
    },
    state::DynStore,
};

/// Starts a quiz attempt for a student. The attempt stays `in_progress`
/// until the graded submission arrives.
pub async fn start_attempt(
    State(store): State<DynStore>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    store
        .get_student(req.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
    store
        .get_quiz(req.quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let attempt = store.create_attempt(req.student_id, req.quiz_id).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Accepts a graded submission and runs the full pipeline:
/// score → persist → stats → badge evaluation → real-time ranking recompute.
///
/// The score is computed and persisted first; badge and ranking follow-up
/// failures are logged but never block the score from reaching the student.
pub async fn submit_attempt(
    State(store): State<DynStore>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let attempt = store
        .get_attempt(attempt_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
    if attempt.status != status::IN_PROGRESS {
        return Err(AppError::Conflict(
            "Attempt has already been finalized".to_string(),
        ));
    }

    // A missing quiz aborts the whole submission: the attempt stays
    // unscored rather than silently defaulting to zero.
    let quiz = store
        .get_quiz(attempt.quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let graded = score::compute_score(&req.answers, &quiz);

    let outcome = AttemptOutcome {
        answers: req.answers,
        raw_score: graded.raw,
        percentage: graded.percentage,
        passed: graded.passed,
        status: if req.timed_out {
            status::TIMED_OUT.to_string()
        } else {
            status::SUBMITTED.to_string()
        },
        total_time_spent: req.total_time_spent,
        timed_out: req.timed_out,
    };
    let attempt = store.finalize_attempt(attempt_id, &outcome).await?;

    let newly_awarded_badges = match run_follow_up(&store, &attempt).await {
        Ok(badges) => badges,
        Err(e) => {
            tracing::error!(
                attempt_id,
                student_id = attempt.student_id,
                error = %e,
                "badge/ranking follow-up failed, score still delivered"
            );
            Vec::new()
        }
    };

    Ok(Json(SubmitAttemptResponse {
        attempt_id: attempt.id,
        raw_score: attempt.raw_score,
        percentage: attempt.percentage,
        passed: attempt.passed,
        newly_awarded_badges,
    }))
}

/// Downstream consequences of a finalized attempt: recompute stats, evaluate
/// the badge catalog, then the real-time ranking recompute.
async fn run_follow_up(
    store: &DynStore,
    attempt: &QuizAttempt,
) -> Result<Vec<AwardedBadge>, AppError> {
    let history = store.attempts_for_student(attempt.student_id).await?;
    let stats = stats::aggregate(&history);

    let ctx = AwardContext {
        attempt_id: Some(attempt.id),
        score_achieved: Some(attempt.percentage),
        time_spent: Some(attempt.total_time_spent),
    };
    // Criteria-less definitions are manual badges; the automatic path never
    // awards them.
    let evaluation =
        badges::evaluate(store.as_ref(), attempt.student_id, &stats, &ctx, false).await?;

    ranking::recompute_student(store.as_ref(), attempt.student_id).await?;

    Ok(evaluation.newly_awarded)
}
