//! One-shot calls against the leaderboard backend.
//!
//! The daemon pushes and polls on its own schedule; these commands exist for
//! setup and for checking the backend by hand.

use clap::Subcommand;
use mission_focus_core::error::SyncError;
use mission_focus_core::format::format_minutes;
use mission_focus_core::sync::{validate_email, RankingClient};
use mission_focus_core::Config;

use super::{block_on, load_today, open_store, CmdResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Register with the backend and remember the identity
    Register {
        /// Email to register
        email: String,
    },
    /// Push today's totals once
    Push,
    /// Show today's rank
    Rank,
    /// Show the leaderboard
    Leaderboard {
        /// Number of entries
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

pub fn run(action: SyncAction) -> CmdResult {
    let mut config = Config::load()?;
    let client = RankingClient::new(&config.sync.backend_url)?;

    match action {
        SyncAction::Register { email } => {
            let email = email.trim().to_string();
            validate_email(&email)?;
            let profile = block_on(client.register(&email))??;
            config.set("user_identity", &email)?;
            println!(
                "registered {} (all-time productive {})",
                profile.email,
                format_minutes(profile.total_productive_all_time)
            );
        }
        SyncAction::Push => {
            let state = load_today(&open_store()?)?;
            let email = identity(&config, state.user_identity.as_deref())?;
            let profile = block_on(client.update_time(
                &email,
                state.productive_minutes,
                state.unproductive_minutes,
            ))??;
            println!(
                "pushed: productive {}, unproductive {}",
                format_minutes(profile.productive_time),
                format_minutes(profile.unproductive_time)
            );
        }
        SyncAction::Rank => {
            let email = identity(&config, None)?;
            let status = block_on(client.ranking(&email))??;
            if status.rank == 0 {
                println!("not ranked yet today ({} users)", status.total);
            } else {
                println!("rank {} of {}", status.rank, status.total);
            }
        }
        SyncAction::Leaderboard { limit } => {
            let board = block_on(client.leaderboard(limit))??;
            println!("Leaderboard for {} ({} users)", board.date, board.total);
            for entry in &board.leaderboard {
                println!(
                    "{:>3}. {:<32} {}",
                    entry.rank,
                    entry.email,
                    format_minutes(entry.productive_time)
                );
            }
        }
    }
    Ok(())
}

/// Configured identity first, then the one the engine last saw.
fn identity(config: &Config, persisted: Option<&str>) -> Result<String, SyncError> {
    config
        .user_identity
        .as_deref()
        .or(persisted)
        .map(str::to_string)
        .ok_or(SyncError::NoIdentity)
}
