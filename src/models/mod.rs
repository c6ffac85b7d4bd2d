// src/models/mod.rs

pub mod attempt;
pub mod badge;
pub mod quiz;
pub mod ranking;
pub mod student;
