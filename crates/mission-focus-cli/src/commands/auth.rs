use clap::Subcommand;
use mission_focus_core::credentials::{self, GEMINI_API_KEY, GEMINI_API_KEY_ENV};

use super::CmdResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the remote classifier API key in the OS keyring
    SetGeminiKey {
        /// API key
        key: String,
    },
    /// Remove the stored classifier API key
    ClearGeminiKey,
    /// Check whether a classifier key is available
    Status,
}

pub fn run(action: AuthAction) -> CmdResult {
    match action {
        AuthAction::SetGeminiKey { key } => {
            let key = key.trim();
            if key.is_empty() {
                return Err("API key must not be empty".into());
            }
            credentials::set(GEMINI_API_KEY, key)?;
            println!("classifier key stored");
        }
        AuthAction::ClearGeminiKey => {
            credentials::delete(GEMINI_API_KEY)?;
            println!("classifier key removed");
        }
        AuthAction::Status => {
            let from_env = std::env::var(GEMINI_API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty());
            if from_env {
                println!("classifier key: set ({GEMINI_API_KEY_ENV})");
            } else {
                match credentials::get(GEMINI_API_KEY) {
                    Ok(Some(k)) if !k.trim().is_empty() => println!("classifier key: set (keyring)"),
                    Ok(_) => println!("classifier key: not set"),
                    Err(e) => println!("classifier key: keyring unavailable ({e})"),
                }
            }
        }
    }
    Ok(())
}
