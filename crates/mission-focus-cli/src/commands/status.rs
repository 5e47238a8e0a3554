use chrono::{DateTime, Local};
use mission_focus_core::accounting::{
    AccountingEngine, AccountingState, Limits, Snapshot, TimerState,
};
use mission_focus_core::format::{format_minutes, progress_pct};
use mission_focus_core::storage::StateStore;
use mission_focus_core::sync::mask_identity;
use mission_focus_core::Config;

use super::{load_today, open_store, CmdResult};

pub fn run(json: bool) -> CmdResult {
    let config = Config::load_or_default();
    let store = open_store()?;
    let state = load_today(&store)?;
    let snapshot = Snapshot {
        productive_minutes: state.productive_minutes,
        unproductive_minutes: state.unproductive_minutes,
        day: state.day.clone(),
        timer: state.timer_state(),
        user_identity: state.user_identity.clone().or(config.user_identity.clone()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let limits = config.limits();
    println!("Day:          {}", snapshot.day);
    println!(
        "Productive:   {} / {} ({}%)",
        format_minutes(snapshot.productive_minutes),
        format_minutes(limits.productive_goal),
        progress_pct(snapshot.productive_minutes, limits.productive_goal),
    );
    println!(
        "Unproductive: {} / {} ({}%)",
        format_minutes(snapshot.unproductive_minutes),
        format_minutes(limits.unproductive_limit),
        progress_pct(snapshot.unproductive_minutes, limits.unproductive_limit),
    );
    println!("Timer:        {}", describe_timer(snapshot.timer));
    match &snapshot.user_identity {
        Some(email) => println!("Identity:     {}", mask_identity(email)),
        None => println!("Identity:     (not set)"),
    }
    if let Some(at) = state.last_sync_timestamp {
        println!("Last sync:    {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}

/// Zero today's totals and alert flags in the persisted record.
///
/// A running daemon keeps its own copy; the extension's reset goes through
/// the daemon instead.
pub fn reset() -> CmdResult {
    let config = Config::load_or_default();
    let store = open_store()?;
    let state = load_today(&store)?;
    store.save(&reset_state(state, config.limits(), Local::now()))?;
    println!("today's totals reset");
    Ok(())
}

fn reset_state(state: AccountingState, limits: Limits, now: DateTime<Local>) -> AccountingState {
    let mut engine = AccountingEngine::restore(state, limits, now);
    for event in engine.reset_day(now) {
        tracing::debug!(?event, "engine event");
    }
    engine.state().clone()
}

fn describe_timer(timer: TimerState) -> String {
    match timer {
        TimerState::Idle => "idle".to_string(),
        TimerState::Accruing(c) => format!("accruing ({})", c.as_str()),
        TimerState::Suspended(c) => format!("suspended ({})", c.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mission_focus_core::accounting::{day_key, Category};

    #[test]
    fn reset_clears_totals_and_flags_but_keeps_identity() {
        let now = Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut state = AccountingState::new(day_key(&now));
        state.productive_minutes = 42.0;
        state.unproductive_minutes = 7.5;
        state.alert_flags.halfway_hit = true;
        state.current_category = Some(Category::Productive);
        state.user_identity = Some("ada@example.com".into());

        let reset = reset_state(state, Limits::default(), now);
        assert_eq!(reset.productive_minutes, 0.0);
        assert_eq!(reset.unproductive_minutes, 0.0);
        assert!(!reset.alert_flags.halfway_hit);
        assert_eq!(reset.timer_state(), TimerState::Idle);
        assert_eq!(reset.day, day_key(&now));
        assert_eq!(reset.user_identity.as_deref(), Some("ada@example.com"));
    }
}
