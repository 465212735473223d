use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A league player with all-time and per-day aggregates.
///
/// `score` is the sum of every non-reverted event delta ever applied;
/// `score_day` only covers the current day and is reset by each day start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub score: i64,
    pub score_day: i64,
    pub best: i64,
    pub bad: i64,
}
