// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Weights of the composite ranking score. Policy constants, must sum to 1.0.
pub const WEIGHT_AVG_SCORE: f64 = 0.35;
pub const WEIGHT_BADGE_COUNT: f64 = 0.25;
pub const WEIGHT_BADGE_POINTS: f64 = 0.15;
pub const WEIGHT_STREAK: f64 = 0.10;
pub const WEIGHT_PERFECT: f64 = 0.08;
pub const WEIGHT_SPEED: f64 = 0.05;
pub const WEIGHT_ACTIVE_DAYS: f64 = 0.02;

/// Leaderboard page size bounds.
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// How many times a batch rank-position write is attempted before the
/// record is skipped and the rest of the batch continues.
pub const RANK_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,

    /// Interval of the periodic global ranking batch, in seconds.
    pub ranking_refresh_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let ranking_refresh_secs = env::var("RANKING_REFRESH_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Self {
            database_url,
            rust_log,
            ranking_refresh_secs,
        }
    }
}
