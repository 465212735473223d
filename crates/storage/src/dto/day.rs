use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::DayMeta;

/// One rule applied `count` times, as captured when the delta is submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreItem {
    pub category_id: String,
    pub category_name: String,
    pub points: i64,
    pub count: i64,
    pub total_points: i64,
}

impl ScoreItem {
    /// Item for `count` occurrences of a rule, with `total_points` derived.
    pub fn new(
        category_id: impl Into<String>,
        category_name: impl Into<String>,
        points: i64,
        count: i64,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            category_name: category_name.into(),
            points,
            count,
            total_points: points * count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApplyDeltaRequest {
    #[validate(length(min = 1, message = "At least one score item is required"))]
    pub items: Vec<ScoreItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApplyDeltaResponse {
    pub applied: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartDayResponse {
    pub session_id: String,
    pub players_reset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetParticipantsRequest {
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsResponse {
    pub session_id: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EditEventCountRequest {
    /// Negative values are clamped to 0
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditEventCountResponse {
    pub event_id: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventResponse {
    pub event_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeDayResponse {
    pub best_updated: usize,
    pub bad_updated: usize,
    pub max_score_day: i64,
    pub min_score_day: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevertDayResponse {
    pub players_updated: usize,
    pub best_reverted: usize,
    pub bad_reverted: usize,
    pub is_finalized: bool,
}

/// What reverting the day would change for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevertPreviewItem {
    pub player_id: String,
    pub name: String,
    pub score_before: i64,
    pub score_after: i64,
    pub score_day_before: i64,
    pub best_before: i64,
    pub best_after: i64,
    pub bad_before: i64,
    pub bad_after: i64,
    pub is_best: bool,
    pub is_bad: bool,
}

/// Read-only forecast of a revert; only players with changes are listed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevertPreview {
    pub items: Vec<RevertPreviewItem>,
    pub best_count: usize,
    pub bad_count: usize,
    pub is_finalized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DaySessionResponse {
    /// `idle`, `active` or `finalized`
    pub state: String,
    pub current_session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub is_finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub last_participants: Vec<String>,
    /// A revert started but did not finish; run it again before a new day.
    pub revert_pending: bool,
}

impl From<DayMeta> for DaySessionResponse {
    fn from(meta: DayMeta) -> Self {
        Self {
            state: meta.state().as_str().to_string(),
            current_session_id: meta.current_session_id,
            started_at: meta.started_at,
            is_finalized: meta.is_finalized,
            finalized_at: meta.finalized_at,
            revert_pending: meta.pending_revert.is_some(),
            last_participants: meta.last_participants.unwrap_or_default(),
        }
    }
}

/// Events of one category folded together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTally {
    pub category_id: String,
    pub category_name: String,
    pub points: i64,
    pub count: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDaySummary {
    pub session_id: String,
    pub player_id: String,
    pub total_points: i64,
    pub categories: Vec<CategoryTally>,
}
