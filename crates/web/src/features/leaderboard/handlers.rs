use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use storage::dto::leaderboard::{LeaderboardEntry, LeaderboardFilter};

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/leaderboard",
    params(LeaderboardFilter),
    responses(
        (status = 200, description = "Players ranked by the requested counter", body = Vec<LeaderboardEntry>),
        (status = 400, description = "Unknown leaderboard")
    ),
    tag = "leaderboard"
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    filter: Result<Query<LeaderboardFilter>, QueryRejection>,
) -> Result<Response, WebError> {
    let Query(filter) = filter.map_err(|e| WebError::BadRequest(e.body_text()))?;
    let entries = services::get_leaderboard(state.store(), filter.by).await?;

    Ok(Json(entries).into_response())
}
