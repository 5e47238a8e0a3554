mod config;
pub mod database;
pub mod state_store;

pub use config::{
    minutes_from_hms, ClassifierConfig, Config, ObserverConfig, SyncConfig,
};
pub use database::Database;
pub use state_store::{MemoryStore, SqliteStateStore, StateStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable selecting the data directory flavour.
pub const ENV_VAR: &str = "MISSION_FOCUS_ENV";

/// Environment variable overriding the data directory outright.
pub const DATA_DIR_VAR: &str = "MISSION_FOCUS_DATA_DIR";

/// Returns `~/.config/mission-focus[-dev]/` based on MISSION_FOCUS_ENV.
///
/// Set MISSION_FOCUS_ENV=dev to use the development data directory, or
/// MISSION_FOCUS_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os(DATA_DIR_VAR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("mission-focus-dev")
            } else {
                base_dir.join("mission-focus")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
