//! Core Module - Query Facade & Leaderboards

pub mod farm_data;
pub mod leaderboard;

pub use farm_data::*;
pub use leaderboard::*;
