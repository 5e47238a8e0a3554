//! # Mission Focus Core Library
//!
//! This library provides the core logic for Mission Focus, which accounts
//! the time a user spends watching YouTube as productive or unproductive.
//! The `mission-focus` CLI hosts it as a long-lived daemon for the browser
//! extension and exposes one-shot commands over the same types.
//!
//! ## Architecture
//!
//! - **Accounting Engine**: A wall-clock-based state machine owning the single
//!   accruing interval, daily totals, alert flags and day rollover
//! - **Engine Service**: The tokio task that owns the engine, ticks it once a
//!   second and serializes every operation through a message channel
//! - **Classifier**: Keyword matching with a remote language-model fallback
//! - **Content Observer**: Per-page detection, classification and media relay
//! - **Sync**: Best-effort push of totals to the ranking backend
//! - **Storage**: SQLite key-value state and TOML configuration
//!
//! ## Key Components
//!
//! - [`AccountingEngine`]: Core accounting state machine
//! - [`EngineService`] / [`EngineHandle`]: Serialized access to the engine
//! - [`Classifier`]: Two-tier video classification
//! - [`ContentObserver`]: Page-side observer
//! - [`Config`]: Application configuration management

pub mod accounting;
pub mod classifier;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod events;
pub mod format;
pub mod notify;
pub mod observer;
pub mod protocol;
pub mod service;
pub mod storage;
pub mod sync;

pub use accounting::{
    AccountingEngine, AccountingState, Alert, Category, Limits, Snapshot, TimerState,
};
pub use classifier::{Classifier, GeminiClassifier, VideoMetadata};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    ClassifierError, ConfigError, CoreError, DatabaseError, EngineError, SyncError,
    ValidationError,
};
pub use events::Event;
pub use notify::{Notification, NotificationKind, Notifier};
pub use observer::{ContentObserver, ObserverOptions, RetryBudget};
pub use protocol::{EngineRequest, EngineResponse, ObserverRequest, ObserverResponse};
pub use service::{EngineHandle, EngineService, PendingReply, ServiceOptions, TabProbe};
pub use storage::{Config, Database, SqliteStateStore, StateStore};
pub use sync::{RankingClient, SyncScheduler};
