//! Durable home of the [`AccountingState`] record.

use std::sync::{Arc, Mutex};

use super::Database;
use crate::accounting::AccountingState;
use crate::error::DatabaseError;

/// kv key holding the serialized accounting record.
pub const STATE_KEY: &str = "accounting_state";

/// Load/save seam for the engine service. Implementations only need to be
/// `Send`: the service task owns its store.
pub trait StateStore: Send {
    fn load(&self) -> Result<Option<AccountingState>, DatabaseError>;
    fn save(&self, state: &AccountingState) -> Result<(), DatabaseError>;
}

pub struct SqliteStateStore {
    db: Database,
}

impl SqliteStateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self) -> Result<Option<AccountingState>, DatabaseError> {
        let Some(raw) = self.db.kv_get(STATE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| DatabaseError::Corrupt {
                key: STATE_KEY.to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, state: &AccountingState) -> Result<(), DatabaseError> {
        let raw = serde_json::to_string(state).map_err(|e| DatabaseError::Corrupt {
            key: STATE_KEY.to_string(),
            message: e.to_string(),
        })?;
        self.db.kv_set(STATE_KEY, &raw)
    }
}

/// In-memory store. Clones share contents; saves can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    state: Option<AccountingState>,
    failing: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AccountingState) -> Self {
        let store = Self::default();
        store.lock().state = Some(state);
        store
    }

    /// Make every subsequent save fail with [`DatabaseError::Locked`].
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn saved(&self) -> Option<AccountingState> {
        self.lock().state.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<AccountingState>, DatabaseError> {
        Ok(self.lock().state.clone())
    }

    fn save(&self, state: &AccountingState) -> Result<(), DatabaseError> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(DatabaseError::Locked);
        }
        inner.state = Some(state.clone());
        inner.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::Category;

    #[test]
    fn sqlite_store_roundtrips_state() {
        let store = SqliteStateStore::new(Database::open_memory().unwrap());
        assert!(store.load().unwrap().is_none());

        let mut state = AccountingState::new("Mon Jan 01 2024");
        state.productive_minutes = 3.25;
        state.current_category = Some(Category::Productive);
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn corrupt_record_is_reported() {
        let db = Database::open_memory().unwrap();
        db.kv_set(STATE_KEY, "{not json").unwrap();
        let store = SqliteStateStore::new(db);
        assert!(matches!(store.load(), Err(DatabaseError::Corrupt { .. })));
    }

    #[test]
    fn memory_store_can_fail_saves() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(store.save(&AccountingState::new("d")).is_err());
        assert!(store.saved().is_none());
        store.set_failing(false);
        store.save(&AccountingState::new("d")).unwrap();
        assert_eq!(store.save_count(), 1);
    }
}
