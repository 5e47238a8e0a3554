use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::accounting::{Alert, Category};

/// Every state change of the accounting engine produces an Event.
/// The service loop routes alerts to the notifier and logs the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A new accruing interval opened.
    IntervalOpened {
        category: Category,
        at: DateTime<Local>,
    },
    /// Elapsed wall-clock time was credited to an accumulator.
    Flushed {
        category: Category,
        minutes: f64,
        at: DateTime<Local>,
    },
    TimerSuspended {
        category: Category,
        at: DateTime<Local>,
    },
    TimerResumed {
        category: Category,
        at: DateTime<Local>,
    },
    TimerStopped {
        category: Category,
        at: DateTime<Local>,
    },
    /// The page reported a media pause; accrual continues until the user
    /// chooses.
    MediaPaused {
        at: DateTime<Local>,
    },
    AlertRaised {
        alert: Alert,
        at: DateTime<Local>,
    },
    /// The calendar day changed. Carries the finished day's final totals.
    DayRolledOver {
        previous_day: String,
        day: String,
        productive_minutes: f64,
        unproductive_minutes: f64,
        at: DateTime<Local>,
    },
    DayReset {
        day: String,
        at: DateTime<Local>,
    },
}
