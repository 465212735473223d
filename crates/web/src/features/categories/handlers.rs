use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{dto::category::CreateCategoryRequest, models::Category};
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List all scoring rules", body = Vec<Category>)
    ),
    tag = "categories"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Response, WebError> {
    let categories = services::list_categories(state.store()).await?;

    Ok(Json(categories).into_response())
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Scoring rule created", body = Category),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let category = services::create_category(state.store(), &req).await?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = String, Path, description = "Category id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Scoring rule deleted; recorded events keep their copy"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    services::delete_category(state.store(), &id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
