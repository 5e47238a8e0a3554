pub mod auth;
pub mod classify;
pub mod config;
pub mod daemon;
pub mod status;
pub mod sync;

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use mission_focus_core::accounting::{day_key, AccountingState};
use mission_focus_core::classifier::GeminiClassifier;
use mission_focus_core::storage::{Database, SqliteStateStore, StateStore};
use mission_focus_core::{credentials, Classifier, Config};

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Run one future to completion on a fresh single-threaded runtime.
pub fn block_on<F: Future>(future: F) -> CmdResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

pub fn open_store() -> CmdResult<SqliteStateStore> {
    Ok(SqliteStateStore::new(Database::open()?))
}

/// The persisted record as the daemon last wrote it. A record from another
/// day reads as empty totals with the identity carried over.
pub fn load_today(store: &SqliteStateStore) -> CmdResult<AccountingState> {
    let today = day_key(&Local::now());
    let state = match store.load()? {
        Some(state) if state.day == today => state,
        Some(stale) => stale.restored(&today),
        None => AccountingState::new(today),
    };
    Ok(state)
}

/// Local-only unless a classifier key is configured and `remote` is set.
pub fn build_classifier(config: &Config, remote: bool) -> CmdResult<Classifier> {
    if !remote {
        return Ok(Classifier::local_only());
    }
    let key = match credentials::gemini_api_key() {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!("keyring unavailable, remote classifier disabled: {e}");
            None
        }
    };
    let Some(key) = key else {
        return Ok(Classifier::local_only());
    };
    let remote = GeminiClassifier::with_endpoint(
        &config.classifier.endpoint,
        config.classifier.model.clone(),
        key,
    )?;
    Ok(Classifier::new(Arc::new(remote)).with_timeout(config.classifier_timeout()))
}
