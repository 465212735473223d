use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};

use super::handlers::{
    apply_delta, delete_event, edit_event_count, finalize_day, get_day_session, list_events,
    list_participants, preview_revert, revert_day, set_participants, start_day,
    summarize_events,
};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

const EVENTS: &str = "/sessions/:session_id/players/:player_id/events";

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/start", post(start_day))
        .route("/revert", post(revert_day))
        .route("/sessions/:session_id/participants", put(set_participants))
        .route("/sessions/:session_id/finalize", post(finalize_day))
        .route(EVENTS, post(apply_delta))
        .route(
            &format!("{EVENTS}/:event_id"),
            patch(edit_event_count).delete(delete_event),
        )
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(get_day_session))
        .route("/revert/preview", get(preview_revert))
        .route("/sessions/:session_id/participants", get(list_participants))
        .route(EVENTS, get(list_events))
        .route(&format!("{EVENTS}/summary"), get(summarize_events))
        .merge(protected)
}
