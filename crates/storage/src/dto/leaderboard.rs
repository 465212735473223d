use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum LeaderboardKind {
    #[default]
    Score,
    ScoreDay,
    Best,
    Bad,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardFilter {
    /// `score` (default), `scoreDay`, `best` or `bad`
    #[serde(default)]
    pub by: LeaderboardKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub position: usize,
    pub player_id: String,
    pub name: String,
    pub value: i64,
}
