//! Notification presenter.
//!
//! Turns alerts and ranking news into user-facing text and hands it to a
//! [`Notifier`]. De-duplication lives in the engine's alert flags and the
//! backend's `shouldNotify`; presenters never filter.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::accounting::Alert;
use crate::format::format_minutes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    UnproductiveLimit,
    ProductiveHalfway,
    ProductiveGoal,
    TopRank,
    Welcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn from_alert(alert: &Alert) -> Self {
        match *alert {
            Alert::UnproductiveLimit { minutes, limit } => Self {
                kind: NotificationKind::UnproductiveLimit,
                title: "Time check".into(),
                message: format!(
                    "You've spent {} on unproductive videos today (limit {}). Time to refocus?",
                    format_minutes(minutes),
                    format_minutes(limit)
                ),
            },
            Alert::ProductiveHalfway { minutes, goal } => Self {
                kind: NotificationKind::ProductiveHalfway,
                title: "Halfway there".into(),
                message: format!(
                    "{} of productive watching so far, half of your {} goal.",
                    format_minutes(minutes),
                    format_minutes(goal)
                ),
            },
            Alert::ProductiveGoal { minutes, goal } => Self {
                kind: NotificationKind::ProductiveGoal,
                title: "Goal reached".into(),
                message: format!(
                    "You hit your productive goal of {} ({} today).",
                    format_minutes(goal),
                    format_minutes(minutes)
                ),
            },
        }
    }

    pub fn top_rank(total: u32) -> Self {
        Self {
            kind: NotificationKind::TopRank,
            title: "You're #1 today".into(),
            message: format!("You lead today's leaderboard out of {total} focused users."),
        }
    }

    pub fn welcome() -> Self {
        Self {
            kind: NotificationKind::Welcome,
            title: "Welcome to Mission Focus".into(),
            message: "Set your focus areas and daily goals with `mission-focus config`.".into(),
        }
    }
}

/// Rendering surface. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: &Notification) {
        tracing::info!(kind = ?n.kind, title = %n.title, "{}", n.message);
    }
}

/// Keeps everything it is shown. Clones share the list.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications().iter().map(|n| n.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, n: &Notification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(n.clone());
    }
}
