// src/handlers/mod.rs

pub mod admin;
pub mod attempts;
pub mod badges;
pub mod leaderboard;
pub mod rankings;
