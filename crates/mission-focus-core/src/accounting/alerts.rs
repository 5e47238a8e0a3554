//! Threshold alerts: unproductive limit, productive halfway, productive goal.
//!
//! Each alert is guarded by a flag in [`AlertFlags`] and fires at most once
//! per day. Alerts never influence accrual.

use serde::{Deserialize, Serialize};

use super::state::{AccountingState, Category};

pub const DEFAULT_PRODUCTIVE_GOAL: f64 = 120.0;
pub const DEFAULT_UNPRODUCTIVE_LIMIT: f64 = 30.0;

/// Daily thresholds in (fractional) minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub productive_goal: f64,
    pub unproductive_limit: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            productive_goal: DEFAULT_PRODUCTIVE_GOAL,
            unproductive_limit: DEFAULT_UNPRODUCTIVE_LIMIT,
        }
    }
}

impl Limits {
    /// Build limits, substituting defaults for zero, negative or non-finite
    /// values.
    pub fn new(productive_goal: f64, unproductive_limit: f64) -> Self {
        Self {
            productive_goal: positive_or(productive_goal, DEFAULT_PRODUCTIVE_GOAL),
            unproductive_limit: positive_or(unproductive_limit, DEFAULT_UNPRODUCTIVE_LIMIT),
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    UnproductiveLimit { minutes: f64, limit: f64 },
    ProductiveHalfway { minutes: f64, goal: f64 },
    ProductiveGoal { minutes: f64, goal: f64 },
}

/// Check thresholds for the current category and set the matching flags.
pub(crate) fn evaluate(state: &mut AccountingState, limits: &Limits) -> Vec<Alert> {
    let mut fired = Vec::new();
    match state.current_category {
        Some(Category::Unproductive) => {
            let minutes = state.unproductive_minutes;
            if minutes >= limits.unproductive_limit && !state.alert_flags.unproductive_limit_hit {
                state.alert_flags.unproductive_limit_hit = true;
                fired.push(Alert::UnproductiveLimit {
                    minutes,
                    limit: limits.unproductive_limit,
                });
            }
        }
        Some(Category::Productive) => {
            let minutes = state.productive_minutes;
            let goal = limits.productive_goal;
            if minutes >= goal * 0.5 && !state.alert_flags.halfway_hit {
                state.alert_flags.halfway_hit = true;
                fired.push(Alert::ProductiveHalfway { minutes, goal });
            }
            if minutes >= goal && !state.alert_flags.goal_hit {
                state.alert_flags.goal_hit = true;
                fired.push(Alert::ProductiveGoal { minutes, goal });
            }
        }
        None => {}
    }
    fired
}
