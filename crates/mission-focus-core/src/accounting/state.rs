use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Browser tab identifier as handed over by the host.
pub type TabId = i64;

/// What kind of time an interval accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Productive,
    Unproductive,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Productive => "productive",
            Category::Unproductive => "unproductive",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "productive" => Ok(Category::Productive),
            "unproductive" => Ok(Category::Unproductive),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Derived view of the single accounting timer.
///
/// ```text
/// Idle -> Accruing(c) <-> Suspended(c) -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "category", rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Accruing(Category),
    Suspended(Category),
}

/// One-shot alert guards for the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFlags {
    pub unproductive_limit_hit: bool,
    pub halfway_hit: bool,
    pub goal_hit: bool,
}

/// The process-wide accounting record.
///
/// Owned by [`AccountingEngine`](super::AccountingEngine); never mutated
/// from outside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingState {
    #[serde(default)]
    pub active_tab_id: Option<TabId>,
    #[serde(default)]
    pub current_category: Option<Category>,
    /// Start of the open accruing interval. `None` while idle or suspended.
    #[serde(default)]
    pub interval_start: Option<DateTime<Local>>,
    #[serde(default)]
    pub timer_suspended: bool,
    #[serde(default)]
    pub productive_minutes: f64,
    #[serde(default)]
    pub unproductive_minutes: f64,
    pub day: String,
    #[serde(default)]
    pub alert_flags: AlertFlags,
    #[serde(default)]
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_identity: Option<String>,
}

impl AccountingState {
    pub fn new(day: impl Into<String>) -> Self {
        Self {
            active_tab_id: None,
            current_category: None,
            interval_start: None,
            timer_suspended: false,
            productive_minutes: 0.0,
            unproductive_minutes: 0.0,
            day: day.into(),
            alert_flags: AlertFlags::default(),
            last_sync_timestamp: None,
            user_identity: None,
        }
    }

    pub fn timer_state(&self) -> TimerState {
        match (self.current_category, self.timer_suspended) {
            (None, _) => TimerState::Idle,
            (Some(c), true) => TimerState::Suspended(c),
            (Some(c), false) => TimerState::Accruing(c),
        }
    }

    /// Prepare a persisted record for a fresh process.
    ///
    /// Open intervals never survive a restart. A record from another day
    /// keeps only the identity and sync timestamp.
    pub fn restored(self, today: &str) -> Self {
        if self.day != today {
            let mut fresh = Self::new(today);
            fresh.user_identity = self.user_identity;
            fresh.last_sync_timestamp = self.last_sync_timestamp;
            return fresh;
        }
        Self {
            active_tab_id: None,
            current_category: None,
            interval_start: None,
            timer_suspended: false,
            productive_minutes: sanitize_minutes(self.productive_minutes),
            unproductive_minutes: sanitize_minutes(self.unproductive_minutes),
            ..self
        }
    }

    pub(crate) fn accumulator_mut(&mut self, category: Category) -> &mut f64 {
        match category {
            Category::Productive => &mut self.productive_minutes,
            Category::Unproductive => &mut self.unproductive_minutes,
        }
    }

    pub fn total_minutes(&self) -> f64 {
        self.productive_minutes + self.unproductive_minutes
    }
}

/// Calendar-day key in local time, e.g. `Mon Jan 01 2024`.
pub fn day_key(at: &DateTime<Local>) -> String {
    at.format("%a %b %d %Y").to_string()
}

fn sanitize_minutes(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_key_matches_browser_date_string() {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        assert_eq!(day_key(&at), "Mon Jan 01 2024");
    }

    #[test]
    fn timer_state_is_derived_from_fields() {
        let mut state = AccountingState::new("Mon Jan 01 2024");
        assert_eq!(state.timer_state(), TimerState::Idle);
        state.current_category = Some(Category::Productive);
        assert_eq!(state.timer_state(), TimerState::Accruing(Category::Productive));
        state.timer_suspended = true;
        assert_eq!(state.timer_state(), TimerState::Suspended(Category::Productive));
    }

    #[test]
    fn restore_same_day_keeps_totals_but_closes_interval() {
        let mut state = AccountingState::new("Mon Jan 01 2024");
        state.productive_minutes = 12.5;
        state.current_category = Some(Category::Unproductive);
        state.interval_start = Some(Local.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        state.alert_flags.halfway_hit = true;

        let restored = state.restored("Mon Jan 01 2024");
        assert_eq!(restored.productive_minutes, 12.5);
        assert!(restored.alert_flags.halfway_hit);
        assert_eq!(restored.timer_state(), TimerState::Idle);
        assert!(restored.interval_start.is_none());
    }

    #[test]
    fn restore_stale_day_starts_fresh_but_keeps_identity() {
        let mut state = AccountingState::new("Mon Jan 01 2024");
        state.productive_minutes = 40.0;
        state.alert_flags.goal_hit = true;
        state.user_identity = Some("a@b.co".into());

        let restored = state.restored("Tue Jan 02 2024");
        assert_eq!(restored.day, "Tue Jan 02 2024");
        assert_eq!(restored.productive_minutes, 0.0);
        assert_eq!(restored.alert_flags, AlertFlags::default());
        assert_eq!(restored.user_identity.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(" Productive ".parse::<Category>(), Ok(Category::Productive));
        assert!("maybe".parse::<Category>().is_err());
    }

    #[test]
    fn state_serializes_with_camel_case_keys() {
        let state = AccountingState::new("Mon Jan 01 2024");
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("productiveMinutes").is_some());
        assert!(json.get("alertFlags").unwrap().get("unproductiveLimitHit").is_some());
    }
}
