use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Audit record of one rule applied `count` times to a player during a day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DayEvent {
    pub id: String,
    pub session_id: String,
    pub player_id: String,
    pub category_id: String,
    pub category_name: String,
    pub points: i64,
    pub count: i64,
    /// Always `points * count`.
    pub total_points: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl DayEvent {
    pub fn belongs_to(&self, session_id: &str, player_id: &str) -> bool {
        self.session_id == session_id && self.player_id == player_id
    }
}
