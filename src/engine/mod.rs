// src/engine/mod.rs

pub mod badges;
pub mod leaderboard;
pub mod ranking;
pub mod score;
pub mod stats;
