//! Wire types of the ranking backend.

use serde::{Deserialize, Serialize};

/// A user's record as the backend reports it. Times are fractional minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: String,
    #[serde(default)]
    pub productive_time: f64,
    #[serde(default)]
    pub unproductive_time: f64,
    #[serde(default)]
    pub total_productive_all_time: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileEnvelope {
    pub user: Profile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimeUpdate<'a> {
    pub email: &'a str,
    pub productive_time: f64,
    pub unproductive_time: f64,
}

/// Today's standing. `rank` is 0 when the user has no productive time yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingStatus {
    pub rank: u32,
    pub total: u32,
    pub is_top_user: bool,
    /// Set by the backend once per day, the first time the user is ranked
    /// first with at least one productive minute.
    pub should_notify: bool,
    #[serde(default)]
    pub productive_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    /// Already masked by the backend, e.g. `abc***@example.com`.
    pub email: String,
    pub productive_time: f64,
    #[serde(default)]
    pub total_productive_all_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub date: String,
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BackendErrorBody {
    pub error: String,
}
