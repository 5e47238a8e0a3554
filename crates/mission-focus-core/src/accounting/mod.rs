mod alerts;
mod engine;
mod state;

pub use alerts::{Alert, Limits, DEFAULT_PRODUCTIVE_GOAL, DEFAULT_UNPRODUCTIVE_LIMIT};
pub use engine::{AccountingEngine, Snapshot};
pub use state::{day_key, AccountingState, AlertFlags, Category, TabId, TimerState};
