// tests/engine_tests.rs

use std::sync::Arc;

use quizrank::engine::badges::{self, AwardContext};
use quizrank::engine::{leaderboard, ranking, stats};
use quizrank::models::attempt::{AttemptAnswer, AttemptOutcome, status};
use quizrank::models::badge::{BadgeCriteria, CreateBadgeRequest, NewAward};
use quizrank::models::quiz::{CreateQuizRequest, QuizQuestion};
use quizrank::models::ranking::RankScope;
use quizrank::models::student::CreateStudentRequest;
use quizrank::store::{InsertOutcome, MemStore, Store};

async fn seed_student(store: &MemStore, name: &str, institution_id: Option<i64>) -> i64 {
    store
        .create_student(&CreateStudentRequest {
            display_name: name.to_string(),
            institution_id,
        })
        .await
        .unwrap()
        .id
}

async fn seed_quiz(store: &MemStore, module_id: i64, passing_score: i32) -> i64 {
    store
        .create_quiz(&CreateQuizRequest {
            module_id,
            title: format!("Module {} quiz", module_id),
            passing_score,
            questions: vec![
                QuizQuestion { id: 1, points: 50 },
                QuizQuestion { id: 2, points: 50 },
            ],
        })
        .await
        .unwrap()
        .id
}

/// Creates and immediately finalizes a submitted attempt.
async fn submit(store: &MemStore, student_id: i64, quiz_id: i64, percentage: i32, time: i64) {
    let attempt = store.create_attempt(student_id, quiz_id).await.unwrap();
    store
        .finalize_attempt(
            attempt.id,
            &AttemptOutcome {
                answers: vec![AttemptAnswer {
                    question_id: 1,
                    points_earned: percentage,
                }],
                raw_score: percentage,
                percentage,
                passed: percentage >= 60,
                status: status::SUBMITTED.to_string(),
                total_time_spent: time,
                timed_out: false,
            },
        )
        .await
        .unwrap();
}

async fn seed_badge(store: &MemStore, name: &str, points: i32, criteria: BadgeCriteria) -> i64 {
    store
        .create_badge(&CreateBadgeRequest {
            name: name.to_string(),
            description: None,
            points,
            active: true,
            criteria,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn evaluate_is_idempotent_for_unchanged_stats() {
    let store = MemStore::new();
    let student = seed_student(&store, "ida", None).await;
    let quiz = seed_quiz(&store, 1, 60).await;
    submit(&store, student, quiz, 100, 120).await;
    submit(&store, student, quiz, 90, 150).await;

    seed_badge(
        &store,
        "First Steps",
        10,
        BadgeCriteria {
            quiz_count: Some(1),
            ..Default::default()
        },
    )
    .await;
    seed_badge(
        &store,
        "Perfectionist",
        25,
        BadgeCriteria {
            perfect_score: Some(true),
            ..Default::default()
        },
    )
    .await;
    seed_badge(
        &store,
        "Marathoner",
        50,
        BadgeCriteria {
            quiz_count: Some(100),
            ..Default::default()
        },
    )
    .await;

    let history = store.attempts_for_student(student).await.unwrap();
    let stats = stats::aggregate(&history);
    let ctx = AwardContext::default();

    let first = badges::evaluate(&store, student, &stats, &ctx, false)
        .await
        .unwrap();
    assert_eq!(first.newly_awarded.len(), 2);
    assert!(first.failures.is_empty());

    // Same stats, no new attempts: nothing new, total never exceeds catalog.
    let second = badges::evaluate(&store, student, &stats, &ctx, false)
        .await
        .unwrap();
    assert!(second.newly_awarded.is_empty());
    assert_eq!(store.awards_for_student(student).await.unwrap().len(), 2);
}

#[tokio::test]
async fn criteria_less_badges_need_explicit_opt_in() {
    let store = MemStore::new();
    let student = seed_student(&store, "manu", None).await;
    seed_badge(&store, "Event Badge", 5, BadgeCriteria::default()).await;

    let stats = stats::aggregate(&[]);
    let ctx = AwardContext::default();

    let automatic = badges::evaluate(&store, student, &stats, &ctx, false)
        .await
        .unwrap();
    assert!(automatic.newly_awarded.is_empty());

    let manual = badges::evaluate(&store, student, &stats, &ctx, true)
        .await
        .unwrap();
    assert_eq!(manual.newly_awarded.len(), 1);
}

#[tokio::test]
async fn concurrent_awarders_insert_exactly_one_row() {
    let store = Arc::new(MemStore::new());
    let student = seed_student(&store, "racer", None).await;
    let badge = seed_badge(
        &store,
        "Contested",
        10,
        BadgeCriteria {
            quiz_count: Some(1),
            ..Default::default()
        },
    )
    .await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .insert_award(&NewAward {
                    student_id: student,
                    badge_id: badge,
                    attempt_id: None,
                    score_achieved: Some(100),
                    time_spent: Some(60),
                    streak_at_award: Some(1),
                })
                .await
                .unwrap()
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() == InsertOutcome::Inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(store.awards_for_student(student).await.unwrap().len(), 1);
}

#[tokio::test]
async fn recompute_student_is_idempotent() {
    let store = MemStore::new();
    let student = seed_student(&store, "stable", None).await;
    let quiz = seed_quiz(&store, 3, 60).await;
    submit(&store, student, quiz, 85, 300).await;
    submit(&store, student, quiz, 95, 240).await;

    let first = ranking::recompute_student(&store, student).await.unwrap();
    let second = ranking::recompute_student(&store, student).await.unwrap();
    assert_eq!(first.ranking_score, second.ranking_score);
    assert_eq!(first.total_quizzes, 2);
    assert_eq!(first.current_streak, 2);
}

#[tokio::test]
async fn batch_over_empty_scope_updates_nothing() {
    let store = MemStore::new();
    let updated = ranking::recompute_scope(&store, RankScope::Global)
        .await
        .unwrap();
    assert_eq!(updated, 0);

    let updated = ranking::recompute_scope(&store, RankScope::Institution(42))
        .await
        .unwrap();
    assert_eq!(updated, 0);
}

#[tokio::test]
async fn batch_assigns_deterministic_positions_and_percentiles() {
    let store = MemStore::new();
    let quiz = seed_quiz(&store, 1, 60).await;

    // Three students whose histories produce distinct and tied scores.
    let strong_a = seed_student(&store, "strong-a", None).await;
    let strong_b = seed_student(&store, "strong-b", None).await;
    let weak = seed_student(&store, "weak", None).await;

    for student in [strong_a, strong_b] {
        submit(&store, student, quiz, 100, 60).await;
        submit(&store, student, quiz, 100, 60).await;
    }
    submit(&store, weak, quiz, 40, 600).await;

    for student in [strong_a, strong_b, weak] {
        ranking::recompute_student(&store, student).await.unwrap();
    }

    let updated = ranking::recompute_scope(&store, RankScope::Global)
        .await
        .unwrap();
    assert_eq!(updated, 3);

    let a = store.get_ranking(strong_a).await.unwrap().unwrap();
    let b = store.get_ranking(strong_b).await.unwrap().unwrap();
    let w = store.get_ranking(weak).await.unwrap().unwrap();

    // Identical histories tie on score; the lower student id ranks first.
    assert_eq!(a.ranking_score, b.ranking_score);
    assert_eq!(a.global_position, Some(1));
    assert_eq!(b.global_position, Some(2));
    assert_eq!(w.global_position, Some(3));
    assert_eq!(a.global_percentile, Some(100));
    assert_eq!(b.global_percentile, Some(67));
    assert_eq!(w.global_percentile, Some(33));

    // Re-running the batch across unchanged data changes nothing.
    ranking::recompute_scope(&store, RankScope::Global)
        .await
        .unwrap();
    let a_again = store.get_ranking(strong_a).await.unwrap().unwrap();
    assert_eq!(a_again.global_position, Some(1));
}

#[tokio::test]
async fn institutional_scope_only_ranks_its_students() {
    let store = MemStore::new();
    let quiz = seed_quiz(&store, 1, 60).await;
    let inside = seed_student(&store, "inside", Some(7)).await;
    let outside = seed_student(&store, "outside", Some(8)).await;

    submit(&store, inside, quiz, 80, 120).await;
    submit(&store, outside, quiz, 95, 100).await;
    ranking::recompute_student(&store, inside).await.unwrap();
    ranking::recompute_student(&store, outside).await.unwrap();

    let updated = ranking::recompute_scope(&store, RankScope::Institution(7))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let inside_rec = store.get_ranking(inside).await.unwrap().unwrap();
    assert_eq!(inside_rec.institution_position, Some(1));
    assert_eq!(inside_rec.institution_percentile, Some(100));

    // The other institution's student is untouched by this scope.
    let outside_rec = store.get_ranking(outside).await.unwrap().unwrap();
    assert_eq!(outside_rec.institution_position, None);
}

#[tokio::test]
async fn leaderboard_orders_strictly_and_reports_requester() {
    let store = MemStore::new();
    let quiz = seed_quiz(&store, 1, 60).await;

    let mut ids = Vec::new();
    for i in 0..6 {
        let id = seed_student(&store, &format!("s{}", i), None).await;
        // Spread of scores: later students do better.
        submit(&store, id, quiz, 40 + i * 10, 300).await;
        ranking::recompute_student(&store, id).await.unwrap();
        ids.push(id);
    }
    ranking::recompute_scope(&store, RankScope::Global)
        .await
        .unwrap();

    let query = leaderboard::LeaderboardQuery {
        scope: RankScope::Global,
        limit: 3,
        student_id: Some(ids[0]),
    };
    let board = leaderboard::get_leaderboard(&store, &query).await.unwrap();

    assert_eq!(board.entries.len(), 3);
    for pair in board.entries.windows(2) {
        assert!(pair[0].ranking_score >= pair[1].ranking_score);
        assert!(pair[0].percentile >= pair[1].percentile);
    }

    // The weakest student is outside the top 3 but still gets a standing.
    let requester = board.requester_position.expect("requester standing");
    assert_eq!(requester.student_id, ids[0]);
    assert_eq!(requester.position, Some(6));

    // Repeated queries over unchanged data return the same ordering.
    let again = leaderboard::get_leaderboard(&store, &query).await.unwrap();
    let order: Vec<i64> = board.entries.iter().map(|e| e.student_id).collect();
    let order_again: Vec<i64> = again.entries.iter().map(|e| e.student_id).collect();
    assert_eq!(order, order_again);
}

#[tokio::test]
async fn requester_inside_top_set_is_not_duplicated() {
    let store = MemStore::new();
    let quiz = seed_quiz(&store, 1, 60).await;
    let student = seed_student(&store, "solo", None).await;
    submit(&store, student, quiz, 90, 100).await;
    ranking::recompute_student(&store, student).await.unwrap();
    ranking::recompute_scope(&store, RankScope::Global)
        .await
        .unwrap();

    let board = leaderboard::get_leaderboard(
        &store,
        &leaderboard::LeaderboardQuery {
            scope: RankScope::Global,
            limit: 10,
            student_id: Some(student),
        },
    )
    .await
    .unwrap();
    assert_eq!(board.entries.len(), 1);
    assert!(board.requester_position.is_none());
}

#[tokio::test]
async fn timed_out_attempts_do_not_feed_stats() {
    let store = MemStore::new();
    let quiz = seed_quiz(&store, 1, 60).await;
    let student = seed_student(&store, "sleepy", None).await;

    let attempt = store.create_attempt(student, quiz).await.unwrap();
    store
        .finalize_attempt(
            attempt.id,
            &AttemptOutcome {
                answers: Vec::new(),
                raw_score: 0,
                percentage: 0,
                passed: false,
                status: status::TIMED_OUT.to_string(),
                total_time_spent: 1800,
                timed_out: true,
            },
        )
        .await
        .unwrap();

    let history = store.attempts_for_student(student).await.unwrap();
    assert!(history.is_empty());
    let stats = stats::aggregate(&history);
    assert_eq!(stats.total_quizzes, 0);
    assert_eq!(stats.fastest_time, None);
}
