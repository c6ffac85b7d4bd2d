// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempts, badges, leaderboard, rankings},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (attempts, rankings, leaderboard, badges, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let attempt_routes = Router::new()
        .route("/", post(attempts::start_attempt))
        .route("/{id}/submit", post(attempts::submit_attempt));

    let ranking_routes = Router::new().route("/{student_id}", get(rankings::get_student_ranking));

    let badge_routes = Router::new().route("/", get(badges::list_badges));

    let student_routes =
        Router::new().route("/{student_id}/badges", get(badges::list_student_awards));

    let admin_routes = Router::new()
        .route("/students", post(admin::create_student))
        .route("/quizzes", post(admin::create_quiz))
        .route("/badges", post(admin::create_badge))
        .route("/rankings/recompute", post(rankings::recompute_global))
        .route(
            "/rankings/recompute/{institution_id}",
            post(rankings::recompute_institutional),
        );

    Router::new()
        .nest("/api/attempts", attempt_routes)
        .nest("/api/rankings", ranking_routes)
        .nest("/api/badges", badge_routes)
        .nest("/api/students", student_routes)
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
