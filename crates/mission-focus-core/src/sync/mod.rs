//! Leaderboard sync.
//!
//! Pushes the day's totals to the ranking backend and polls the user's
//! rank. Best-effort throughout: nothing here can affect accounting.

pub mod client;
pub mod scheduler;
pub mod types;


pub use client::{mask_identity, validate_email, RankingClient};
pub use scheduler::SyncScheduler;
pub use types::{Leaderboard, LeaderboardEntry, Profile, RankingStatus};
