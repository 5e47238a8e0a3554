use clap::{Args, Subcommand};
use mission_focus_core::format::format_minutes;
use mission_focus_core::storage::minutes_from_hms;
use mission_focus_core::Config;

use super::CmdResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "productive_goal", "sync.backend_url")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value (lists take JSON or a comma-separated string)
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Set the productive goal and unproductive limit
    Goals(GoalArgs),
}

#[derive(Args)]
pub struct GoalArgs {
    /// Productive goal hours
    #[arg(long, default_value_t = 0)]
    goal_hours: u32,
    /// Productive goal minutes
    #[arg(long, default_value_t = 0)]
    goal_minutes: u32,
    /// Productive goal seconds
    #[arg(long, default_value_t = 0)]
    goal_seconds: u32,
    /// Unproductive limit hours
    #[arg(long, default_value_t = 0)]
    limit_hours: u32,
    /// Unproductive limit minutes
    #[arg(long, default_value_t = 0)]
    limit_minutes: u32,
    /// Unproductive limit seconds
    #[arg(long, default_value_t = 0)]
    limit_seconds: u32,
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            if !config.has_key(&key) {
                return Err(format!("unknown key: {key}").into());
            }
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => println!("(not set)"),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Goals(args) => {
            let goal = minutes_from_hms(args.goal_hours, args.goal_minutes, args.goal_seconds)?;
            let limit = minutes_from_hms(args.limit_hours, args.limit_minutes, args.limit_seconds)?;
            let mut config = Config::load()?;
            config.set_goals(goal, limit)?;
            config.save()?;
            println!(
                "productive goal {}, unproductive limit {}",
                format_minutes(goal),
                format_minutes(limit)
            );
        }
    }
    Ok(())
}
