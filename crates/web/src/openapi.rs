use axum::{Json, response::IntoResponse};
use utoipa::OpenApi;

use crate::features;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::players::handlers::list_players,
        features::players::handlers::create_player,
        features::players::handlers::update_player,
        features::players::handlers::delete_player,
        features::categories::handlers::list_categories,
        features::categories::handlers::create_category,
        features::categories::handlers::delete_category,
        features::leaderboard::handlers::get_leaderboard,
        features::day::handlers::get_day_session,
        features::day::handlers::start_day,
        features::day::handlers::revert_day,
        features::day::handlers::preview_revert,
        features::day::handlers::list_participants,
        features::day::handlers::set_participants,
        features::day::handlers::finalize_day,
        features::day::handlers::list_events,
        features::day::handlers::apply_delta,
        features::day::handlers::summarize_events,
        features::day::handlers::edit_event_count,
        features::day::handlers::delete_event,
    ),
    components(
        schemas(
            storage::dto::player::CreatePlayerRequest,
            storage::dto::player::UpdatePlayerRequest,
            storage::dto::player::PlayerResponse,
            storage::dto::category::CreateCategoryRequest,
            storage::dto::leaderboard::LeaderboardKind,
            storage::dto::leaderboard::LeaderboardEntry,
            storage::dto::day::ScoreItem,
            storage::dto::day::ApplyDeltaRequest,
            storage::dto::day::ApplyDeltaResponse,
            storage::dto::day::StartDayResponse,
            storage::dto::day::SetParticipantsRequest,
            storage::dto::day::ParticipantsResponse,
            storage::dto::day::EditEventCountRequest,
            storage::dto::day::EditEventCountResponse,
            storage::dto::day::DeleteEventResponse,
            storage::dto::day::FinalizeDayResponse,
            storage::dto::day::RevertDayResponse,
            storage::dto::day::RevertPreviewItem,
            storage::dto::day::RevertPreview,
            storage::dto::day::DaySessionResponse,
            storage::dto::day::CategoryTally,
            storage::dto::day::PlayerDaySummary,
            storage::models::Player,
            storage::models::Category,
            storage::models::DayEvent,
        )
    ),
    tags(
        (name = "players", description = "League roster"),
        (name = "categories", description = "Scoring rules"),
        (name = "leaderboard", description = "Public rankings"),
        (name = "day", description = "Day scoring lifecycle"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
