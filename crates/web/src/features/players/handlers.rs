use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::player::{CreatePlayerRequest, PlayerResponse, UpdatePlayerRequest};
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/players",
    responses(
        (status = 200, description = "List all players successfully", body = Vec<PlayerResponse>)
    ),
    tag = "players"
)]
pub async fn list_players(State(state): State<AppState>) -> Result<Response, WebError> {
    let players = services::list_players(state.store()).await?;

    let response: Vec<PlayerResponse> = players.into_iter().map(PlayerResponse::from).collect();

    Ok(Json(response).into_response())
}

#[utoipa::path(
    post,
    path = "/api/players",
    request_body = CreatePlayerRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Player registered successfully", body = PlayerResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "players"
)]
pub async fn create_player(
    State(state): State<AppState>,
    Json(req): Json<CreatePlayerRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let player = services::create_player(state.store(), &req).await?;

    Ok((StatusCode::CREATED, Json(PlayerResponse::from(player))).into_response())
}

#[utoipa::path(
    put,
    path = "/api/players/{id}",
    params(
        ("id" = String, Path, description = "Player id")
    ),
    request_body = UpdatePlayerRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Player renamed successfully", body = PlayerResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Player not found")
    ),
    tag = "players"
)]
pub async fn update_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePlayerRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let player = services::update_player(state.store(), &id, &req).await?;

    Ok(Json(PlayerResponse::from(player)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/players/{id}",
    params(
        ("id" = String, Path, description = "Player id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Player deleted successfully"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Player not found")
    ),
    tag = "players"
)]
pub async fn delete_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    services::delete_player(state.store(), &id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
