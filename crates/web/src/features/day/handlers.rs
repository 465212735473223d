use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    dto::day::{
        ApplyDeltaRequest, ApplyDeltaResponse, DaySessionResponse, DeleteEventResponse,
        EditEventCountRequest, EditEventCountResponse, FinalizeDayResponse, ParticipantsResponse,
        PlayerDaySummary, RevertDayResponse, RevertPreview, SetParticipantsRequest,
        StartDayResponse,
    },
    models::DayEvent,
};
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/day",
    responses(
        (status = 200, description = "Current day state", body = DaySessionResponse)
    ),
    tag = "day"
)]
pub async fn get_day_session(State(state): State<AppState>) -> Result<Response, WebError> {
    let meta = services::get_day_session(state.store()).await?;

    Ok(Json(DaySessionResponse::from(meta)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/day/start",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "New day opened; previous day data purged", body = StartDayResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "day"
)]
pub async fn start_day(State(state): State<AppState>) -> Result<Response, WebError> {
    let started = services::start_day(state.store()).await?;

    Ok((StatusCode::CREATED, Json(started)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/day/revert",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Day effects undone", body = RevertDayResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "day"
)]
pub async fn revert_day(State(state): State<AppState>) -> Result<Response, WebError> {
    let report = services::revert_day(state.store()).await?;

    Ok(Json(report).into_response())
}

#[utoipa::path(
    get,
    path = "/api/day/revert/preview",
    responses(
        (status = 200, description = "Changes a revert would make", body = RevertPreview)
    ),
    tag = "day"
)]
pub async fn preview_revert(State(state): State<AppState>) -> Result<Response, WebError> {
    let preview = services::preview_revert(state.store()).await?;

    Ok(Json(preview).into_response())
}

#[utoipa::path(
    get,
    path = "/api/day/sessions/{session_id}/participants",
    params(
        ("session_id" = String, Path, description = "Day session id")
    ),
    responses(
        (status = 200, description = "Participant ids of the session", body = ParticipantsResponse)
    ),
    tag = "day"
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, WebError> {
    let participants = services::list_participants(state.store(), &session_id).await?;

    Ok(Json(participants).into_response())
}

#[utoipa::path(
    put,
    path = "/api/day/sessions/{session_id}/participants",
    params(
        ("session_id" = String, Path, description = "Day session id")
    ),
    request_body = SetParticipantsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Participants set", body = ParticipantsResponse),
        (status = 400, description = "Too many participants"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Day is not active")
    ),
    tag = "day"
)]
pub async fn set_participants(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SetParticipantsRequest>,
) -> Result<Response, WebError> {
    let participants =
        services::set_participants(state.store(), &session_id, &req.participants).await?;

    Ok(Json(participants).into_response())
}

#[utoipa::path(
    post,
    path = "/api/day/sessions/{session_id}/finalize",
    params(
        ("session_id" = String, Path, description = "Day session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Day finalized and best/bad awarded", body = FinalizeDayResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Day is not active"),
        (status = 422, description = "No participants defined")
    ),
    tag = "day"
)]
pub async fn finalize_day(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, WebError> {
    let result = services::finalize_day(state.store(), &session_id).await?;

    Ok(Json(result).into_response())
}

#[utoipa::path(
    get,
    path = "/api/day/sessions/{session_id}/players/{player_id}/events",
    params(
        ("session_id" = String, Path, description = "Day session id"),
        ("player_id" = String, Path, description = "Player id")
    ),
    responses(
        (status = 200, description = "Events of the player, oldest first", body = Vec<DayEvent>)
    ),
    tag = "day"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Path((session_id, player_id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let events = services::list_events(state.store(), &session_id, &player_id).await?;

    Ok(Json(events).into_response())
}

#[utoipa::path(
    post,
    path = "/api/day/sessions/{session_id}/players/{player_id}/events",
    params(
        ("session_id" = String, Path, description = "Day session id"),
        ("player_id" = String, Path, description = "Player id")
    ),
    request_body = ApplyDeltaRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Delta applied", body = ApplyDeltaResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Session or player not found"),
        (status = 409, description = "Day is not active or player is not a participant"),
        (status = 422, description = "No participants defined")
    ),
    tag = "day"
)]
pub async fn apply_delta(
    State(state): State<AppState>,
    Path((session_id, player_id)): Path<(String, String)>,
    Json(req): Json<ApplyDeltaRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let applied =
        services::apply_delta(state.store(), &session_id, &player_id, &req.items).await?;

    Ok((StatusCode::CREATED, Json(applied)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/day/sessions/{session_id}/players/{player_id}/events/summary",
    params(
        ("session_id" = String, Path, description = "Day session id"),
        ("player_id" = String, Path, description = "Player id")
    ),
    responses(
        (status = 200, description = "Events grouped per category", body = PlayerDaySummary)
    ),
    tag = "day"
)]
pub async fn summarize_events(
    State(state): State<AppState>,
    Path((session_id, player_id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let summary = services::summarize_events(state.store(), &session_id, &player_id).await?;

    Ok(Json(summary).into_response())
}

#[utoipa::path(
    patch,
    path = "/api/day/sessions/{session_id}/players/{player_id}/events/{event_id}",
    params(
        ("session_id" = String, Path, description = "Day session id"),
        ("player_id" = String, Path, description = "Player id"),
        ("event_id" = String, Path, description = "Event id")
    ),
    request_body = EditEventCountRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event count corrected", body = EditEventCountResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Day is finalized")
    ),
    tag = "day"
)]
pub async fn edit_event_count(
    State(state): State<AppState>,
    Path((session_id, player_id, event_id)): Path<(String, String, String)>,
    Json(req): Json<EditEventCountRequest>,
) -> Result<Response, WebError> {
    let edited = services::edit_event_count(
        state.store(),
        &session_id,
        &player_id,
        &event_id,
        req.count,
    )
    .await?;

    Ok(Json(edited).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/day/sessions/{session_id}/players/{player_id}/events/{event_id}",
    params(
        ("session_id" = String, Path, description = "Day session id"),
        ("player_id" = String, Path, description = "Player id"),
        ("event_id" = String, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event removed and its points reversed", body = DeleteEventResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Day is finalized")
    ),
    tag = "day"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path((session_id, player_id, event_id)): Path<(String, String, String)>,
) -> Result<Response, WebError> {
    let deleted =
        services::delete_event(state.store(), &session_id, &player_id, &event_id).await?;

    Ok(Json(deleted).into_response())
}
