use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Id of the singleton document holding the current day state.
pub const DAY_META_ID: &str = "day";

/// Lifecycle of the scoring day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayState {
    Idle,
    Active(String),
    Finalized(String),
}

/// The `meta/day` singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DayMeta {
    pub current_session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub is_finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    /// Roster of the most recent participant selection, offered again on the
    /// next day.
    pub last_participants: Option<Vec<String>>,
    /// Players credited with best/bad when the current day was finalized.
    pub best_ids: Vec<String>,
    pub bad_ids: Vec<String>,
    /// Set while a revert is under way; only the revert itself clears it.
    pub pending_revert: Option<PendingRevert>,
}

/// What is left to undo of a day whose revert has started. The award lists
/// shrink as each chunk of players commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingRevert {
    pub session_id: Option<String>,
    pub was_finalized: bool,
    pub best_ids: Vec<String>,
    pub bad_ids: Vec<String>,
}

impl DayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active(_) => "active",
            Self::Finalized(_) => "finalized",
        }
    }
}

impl DayMeta {
    pub fn state(&self) -> DayState {
        match &self.current_session_id {
            None => DayState::Idle,
            Some(id) if self.is_finalized => DayState::Finalized(id.clone()),
            Some(id) => DayState::Active(id.clone()),
        }
    }

    pub fn is_current(&self, session_id: &str) -> bool {
        self.current_session_id.as_deref() == Some(session_id)
    }

    /// The revert work implied by this state: the stored awards count only
    /// once the day is finalized.
    pub fn revert_plan(&self) -> PendingRevert {
        if let Some(pending) = &self.pending_revert {
            return pending.clone();
        }
        let finalized = matches!(self.state(), DayState::Finalized(_));
        PendingRevert {
            session_id: self.current_session_id.clone(),
            was_finalized: finalized,
            best_ids: if finalized { self.best_ids.clone() } else { Vec::new() },
            bad_ids: if finalized { self.bad_ids.clone() } else { Vec::new() },
        }
    }
}

/// Per-session document in `daySessions`, keyed by session id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRecord {
    pub id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub is_finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub participants: Vec<String>,
    pub best_ids: Vec<String>,
    pub bad_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_awards_are_reverted_only_for_a_finalized_day() {
        let active = DayMeta {
            current_session_id: Some("s1".to_string()),
            best_ids: vec!["a".to_string()],
            bad_ids: vec!["b".to_string()],
            ..DayMeta::default()
        };
        let plan = active.revert_plan();
        assert!(!plan.was_finalized);
        assert!(plan.best_ids.is_empty() && plan.bad_ids.is_empty());

        let finalized = DayMeta {
            is_finalized: true,
            ..active
        };
        let plan = finalized.revert_plan();
        assert!(plan.was_finalized);
        assert_eq!(plan.best_ids, vec!["a"]);
        assert_eq!(plan.bad_ids, vec!["b"]);
    }

    #[test]
    fn test_pending_revert_wins_over_the_day_state() {
        let pending = PendingRevert {
            session_id: Some("s1".to_string()),
            was_finalized: true,
            best_ids: vec!["b".to_string()],
            bad_ids: Vec::new(),
        };
        let meta = DayMeta {
            pending_revert: Some(pending.clone()),
            ..DayMeta::default()
        };
        assert_eq!(meta.state(), DayState::Idle);
        assert_eq!(meta.revert_plan(), pending);
    }
}
