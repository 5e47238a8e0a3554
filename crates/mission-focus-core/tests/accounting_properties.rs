//! Property tests for the accounting engine.
//!
//! Random operation sequences are replayed against the engine and against
//! a tiny reference model that credits each gap between operations to
//! whatever was accruing. The two must agree, and totals must never go
//! backwards or exceed the wall-clock time that passed.

use chrono::{DateTime, Duration, Local, TimeZone};
use mission_focus_core::accounting::{AccountingEngine, Category, Limits, TimerState};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Categorize(Category),
    Suspend,
    Resume,
    Stop,
    Tick,
    PauseTimer,
    KeepTimer,
    MediaPaused,
    MediaResumed,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Categorize(Category::Productive)),
        Just(Op::Categorize(Category::Unproductive)),
        Just(Op::Suspend),
        Just(Op::Resume),
        Just(Op::Stop),
        Just(Op::Tick),
        Just(Op::Tick),
        Just(Op::PauseTimer),
        Just(Op::KeepTimer),
        Just(Op::MediaPaused),
        Just(Op::MediaResumed),
    ]
}

fn start() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap()
}

fn apply(engine: &mut AccountingEngine, op: Op, now: DateTime<Local>) {
    match op {
        Op::Categorize(c) => drop(engine.categorize(c, now)),
        Op::Suspend => drop(engine.suspend(now)),
        Op::Resume => drop(engine.resume(now)),
        Op::Stop => drop(engine.stop(now)),
        Op::Tick => drop(engine.tick(now)),
        Op::PauseTimer => drop(engine.pause_timer(now)),
        Op::KeepTimer => drop(engine.keep_timer(now)),
        Op::MediaPaused => drop(engine.media_paused(now)),
        Op::MediaResumed => drop(engine.media_resumed(now)),
    }
}

/// Reference state after `op`, given the state before it.
fn model_next(state: TimerState, op: Op) -> TimerState {
    use TimerState::*;
    match (op, state) {
        (Op::Categorize(c), _) => Accruing(c),
        (Op::Suspend | Op::PauseTimer, Accruing(c)) => Suspended(c),
        (Op::Resume | Op::KeepTimer | Op::MediaResumed, Suspended(c)) => Accruing(c),
        (Op::Stop, _) => Idle,
        (_, s) => s,
    }
}

proptest! {
    #[test]
    fn engine_matches_reference_model(
        steps in prop::collection::vec((op_strategy(), 0i64..120), 1..150)
    ) {
        let mut engine = AccountingEngine::new(Limits::default(), start());
        let mut now = start();
        let mut model = TimerState::Idle;
        let (mut productive, mut unproductive) = (0.0f64, 0.0f64);
        let mut last_total = 0.0f64;

        for (op, gap) in steps {
            now += Duration::seconds(gap);
            if let TimerState::Accruing(c) = model {
                let minutes = gap as f64 / 60.0;
                match c {
                    Category::Productive => productive += minutes,
                    Category::Unproductive => unproductive += minutes,
                }
            }

            apply(&mut engine, op, now);
            model = model_next(model, op);

            prop_assert_eq!(engine.timer_state(), model);
            let total = engine.state().total_minutes();
            prop_assert!(total + 1e-9 >= last_total, "totals went backwards");
            last_total = total;
        }

        drop(engine.stop(now));
        let state = engine.state();
        prop_assert!((state.productive_minutes - productive).abs() < 1e-6);
        prop_assert!((state.unproductive_minutes - unproductive).abs() < 1e-6);

        let wall = (now - start()).num_milliseconds() as f64 / 60_000.0;
        prop_assert!(state.total_minutes() <= wall + 1e-6);
    }

    #[test]
    fn each_alert_fires_at_most_once_per_day(
        gaps in prop::collection::vec(1i64..90, 1..200),
        limit in 0.1f64..5.0
    ) {
        let mut engine = AccountingEngine::new(Limits::new(limit, limit), start());
        let mut now = start();
        let mut alerts = 0usize;
        let mut category = Category::Productive;

        alerts += count_alerts(&engine.categorize(category, now));
        for (i, gap) in gaps.into_iter().enumerate() {
            now += Duration::seconds(gap);
            if i % 7 == 6 {
                category = match category {
                    Category::Productive => Category::Unproductive,
                    Category::Unproductive => Category::Productive,
                };
                alerts += count_alerts(&engine.categorize(category, now));
            } else {
                alerts += count_alerts(&engine.tick(now));
            }
        }
        // Halfway, goal and limit: three distinct one-shot alerts at most.
        prop_assert!(alerts <= 3);
    }
}

fn count_alerts(events: &[mission_focus_core::Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, mission_focus_core::Event::AlertRaised { .. }))
        .count()
}
