use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use super::handlers::{create_player, delete_player, list_players, update_player};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_player))
        .route("/:id", put(update_player).delete(delete_player))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(list_players))
        .merge(protected)
}
