use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use super::handlers::{create_category, delete_category, list_categories};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_category))
        .route("/:id", delete(delete_category))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth));

    Router::new()
        .route("/", get(list_categories))
        .merge(protected)
}
