use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Player;

/// Request payload for registering a player
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePlayerRequest {
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    /// Starting all-time score, 0 when omitted
    pub score: Option<i64>,
}

/// Request payload for renaming a player
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePlayerRequest {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub id: String,
    pub name: String,
    pub score: i64,
    pub score_day: i64,
    pub best: i64,
    pub bad: i64,
}

pub(crate) fn validate_name(name: &str) -> Result<(), validator::ValidationError> {
    let len = name.trim().chars().count();
    if (1..=100).contains(&len) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_name")
            .with_message("Name must be between 1 and 100 characters".into()))
    }
}

impl From<Player> for PlayerResponse {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            name: player.name,
            score: player.score,
            score_day: player.score_day,
            best: player.best,
            bad: player.bad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_is_rejected() {
        let req = CreatePlayerRequest {
            name: "   ".to_string(),
            score: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_regular_name_is_accepted() {
        let req = UpdatePlayerRequest {
            name: "Dudu".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
