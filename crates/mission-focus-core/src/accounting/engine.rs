//! Accounting engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads or read the system clock - every operation takes `now`
//! and the caller is responsible for calling `tick()` once per second.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Accruing(c) -> Suspended(c) -> Accruing(c) -> Idle
//!           ^    |
//!           +----+ categorize(other)
//! ```
//!
//! Elapsed time is always the wall-clock delta since `interval_start`, so
//! late or skipped ticks neither lose nor invent time. Every operation first
//! rolls the day over if the calendar day changed.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::alerts::{self, Limits};
use super::state::{day_key, AccountingState, Category, TabId, TimerState};
use crate::events::Event;

/// Read-only view handed to UI collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub productive_minutes: f64,
    pub unproductive_minutes: f64,
    pub day: String,
    pub timer: TimerState,
    #[serde(default)]
    pub user_identity: Option<String>,
}

impl Snapshot {
    /// Whether the totals belong to `today`. Stale totals display as zero.
    pub fn is_current(&self, today: &str) -> bool {
        self.day == today
    }
}

#[derive(Debug, Clone)]
pub struct AccountingEngine {
    state: AccountingState,
    limits: Limits,
    /// Set whenever persisted fields change; cleared by the persister.
    dirty: bool,
}

impl AccountingEngine {
    /// Fresh engine for the day containing `now`.
    pub fn new(limits: Limits, now: DateTime<Local>) -> Self {
        Self {
            state: AccountingState::new(day_key(&now)),
            limits,
            dirty: true,
        }
    }

    /// Engine resumed from a persisted record. Stale days start fresh and
    /// open intervals are dropped.
    pub fn restore(state: AccountingState, limits: Limits, now: DateTime<Local>) -> Self {
        let today = day_key(&now);
        let stale = state.day != today;
        Self {
            state: state.restored(&today),
            limits,
            dirty: stale,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &AccountingState {
        &self.state
    }

    pub fn timer_state(&self) -> TimerState {
        self.state.timer_state()
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.state.active_tab_id
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            productive_minutes: self.state.productive_minutes,
            unproductive_minutes: self.state.unproductive_minutes,
            day: self.state.day.clone(),
            timer: self.state.timer_state(),
            user_identity: self.state.user_identity.clone(),
        }
    }

    /// Returns whether persisted fields changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Re-arm persistence after a failed write.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn categorize(&mut self, category: Category, now: DateTime<Local>) -> Vec<Event> {
        let mut events = self.roll_over_if_needed(now);
        self.flush_elapsed(now, &mut events);
        self.state.current_category = Some(category);
        self.state.interval_start = Some(now);
        self.state.timer_suspended = false;
        events.push(Event::IntervalOpened { category, at: now });
        self.raise_alerts(now, &mut events);
        events
    }

    pub fn suspend(&mut self, now: DateTime<Local>) -> Vec<Event> {
        let mut events = self.roll_over_if_needed(now);
        if let TimerState::Accruing(category) = self.timer_state() {
            self.flush_elapsed(now, &mut events);
            self.state.interval_start = None;
            self.state.timer_suspended = true;
            events.push(Event::TimerSuspended { category, at: now });
            self.raise_alerts(now, &mut events);
        }
        events
    }

    pub fn resume(&mut self, now: DateTime<Local>) -> Vec<Event> {
        let mut events = self.roll_over_if_needed(now);
        if let TimerState::Suspended(category) = self.timer_state() {
            self.state.interval_start = Some(now);
            self.state.timer_suspended = false;
            events.push(Event::TimerResumed { category, at: now });
        }
        events
    }

    pub fn stop(&mut self, now: DateTime<Local>) -> Vec<Event> {
        let mut events = self.roll_over_if_needed(now);
        if let Some(category) = self.state.current_category {
            self.flush_elapsed(now, &mut events);
            self.state.current_category = None;
            self.state.interval_start = None;
            self.state.timer_suspended = false;
            events.push(Event::TimerStopped { category, at: now });
        }
        events
    }

    /// Call once per second. Flushes the open interval and checks alerts.
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<Event> {
        let mut events = self.roll_over_if_needed(now);
        if let TimerState::Accruing(_) = self.timer_state() {
            self.flush_elapsed(now, &mut events);
            self.raise_alerts(now, &mut events);
        }
        events
    }

    /// User chose to stop accounting after pausing the video.
    pub fn pause_timer(&mut self, now: DateTime<Local>) -> Vec<Event> {
        self.suspend(now)
    }

    /// User chose to keep accruing after pausing the video. From `Accruing`
    /// this leaves the open interval untouched so the pause is credited.
    pub fn keep_timer(&mut self, now: DateTime<Local>) -> Vec<Event> {
        self.resume(now)
    }

    /// Informational; the engine waits for the user's choice.
    pub fn media_paused(&mut self, now: DateTime<Local>) -> Vec<Event> {
        let mut events = self.roll_over_if_needed(now);
        events.push(Event::MediaPaused { at: now });
        events
    }

    /// Playback restarted: the interval restarts at `now` and any suspension
    /// is cleared. An accruing interval is flushed first so nothing is lost.
    pub fn media_resumed(&mut self, now: DateTime<Local>) -> Vec<Event> {
        match self.timer_state() {
            TimerState::Accruing(_) => self.tick(now),
            TimerState::Suspended(_) => self.resume(now),
            TimerState::Idle => self.roll_over_if_needed(now),
        }
    }

    /// Manual full reset: zero accumulators, clear flags, stop the interval.
    pub fn reset_day(&mut self, now: DateTime<Local>) -> Vec<Event> {
        let mut events = self.roll_over_if_needed(now);
        if let Some(category) = self.state.current_category.take() {
            events.push(Event::TimerStopped { category, at: now });
        }
        self.state.interval_start = None;
        self.state.timer_suspended = false;
        self.state.productive_minutes = 0.0;
        self.state.unproductive_minutes = 0.0;
        self.state.alert_flags = Default::default();
        self.state.day = day_key(&now);
        self.dirty = true;
        events.push(Event::DayReset {
            day: self.state.day.clone(),
            at: now,
        });
        events
    }

    /// Day check with no other effect (hourly alarm, reads).
    pub fn check_day(&mut self, now: DateTime<Local>) -> Vec<Event> {
        self.roll_over_if_needed(now)
    }

    pub fn set_active_tab(&mut self, tab: Option<TabId>) {
        self.state.active_tab_id = tab;
    }

    pub fn set_identity(&mut self, identity: Option<String>) {
        if self.state.user_identity != identity {
            self.state.user_identity = identity;
            self.dirty = true;
        }
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    pub fn record_sync(&mut self, at: chrono::DateTime<chrono::Utc>) {
        self.state.last_sync_timestamp = Some(at);
        self.dirty = true;
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Credit wall-clock time since `interval_start` and restart the
    /// interval at `now`. No-op unless accruing.
    fn flush_elapsed(&mut self, now: DateTime<Local>, events: &mut Vec<Event>) {
        let (Some(category), Some(start), false) = (
            self.state.current_category,
            self.state.interval_start,
            self.state.timer_suspended,
        ) else {
            return;
        };
        let elapsed_ms = (now - start).num_milliseconds().max(0);
        let minutes = elapsed_ms as f64 / 60_000.0;
        *self.state.accumulator_mut(category) += minutes;
        self.state.interval_start = Some(now);
        if minutes > 0.0 {
            self.dirty = true;
            events.push(Event::Flushed {
                category,
                minutes,
                at: now,
            });
        }
    }

    fn raise_alerts(&mut self, now: DateTime<Local>, events: &mut Vec<Event>) {
        for alert in alerts::evaluate(&mut self.state, &self.limits) {
            self.dirty = true;
            events.push(Event::AlertRaised { alert, at: now });
        }
    }

    fn roll_over_if_needed(&mut self, now: DateTime<Local>) -> Vec<Event> {
        let today = day_key(&now);
        if today == self.state.day {
            return Vec::new();
        }
        let mut events = Vec::new();
        // Time since the last flush belongs to the finishing day.
        self.flush_elapsed(now, &mut events);
        let previous_day = std::mem::replace(&mut self.state.day, today);
        events.push(Event::DayRolledOver {
            previous_day,
            day: self.state.day.clone(),
            productive_minutes: self.state.productive_minutes,
            unproductive_minutes: self.state.unproductive_minutes,
            at: now,
        });
        self.state.productive_minutes = 0.0;
        self.state.unproductive_minutes = 0.0;
        self.state.alert_flags = Default::default();
        self.dirty = true;
        events
    }
}
