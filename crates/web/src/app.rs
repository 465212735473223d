use axum::{Router, routing::get};

use crate::features::{categories, day, leaderboard, players};
use crate::middleware::auth::ApiKeys;
use crate::openapi::openapi_json;
use crate::state::AppState;

pub fn router(state: AppState, api_keys: ApiKeys) -> Router {
    Router::new()
        .nest("/api/players", players::routes::routes(api_keys.clone()))
        .nest("/api/categories", categories::routes::routes(api_keys.clone()))
        .nest("/api/leaderboard", leaderboard::routes::routes())
        .nest("/api/day", day::routes::routes(api_keys))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use storage::MemoryLedger;
    use tower::ServiceExt;

    use super::*;

    const KEY: &str = "test-key";

    fn app() -> Router {
        let state = AppState::new(Arc::new(MemoryLedger::new()));
        router(state, ApiKeys::from_comma_separated(KEY))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {KEY}"));
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_player(app: &Router, name: &str) -> String {
        let (status, body) = send(app, Method::POST, "/api/players", Some(json!({"name": name}))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_mutations_require_api_key() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/day/start")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/day")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_player_name_is_validated() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/api/players", Some(json!({"name": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
    }

    #[tokio::test]
    async fn test_full_day_over_http() {
        let app = app();
        let ana = create_player(&app, "Ana").await;
        let bruno = create_player(&app, "Bruno").await;

        let (status, started) = send(&app, Method::POST, "/api/day/start", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let session = started["sessionId"].as_str().unwrap().to_string();
        let events = format!("/api/day/sessions/{session}/players/{ana}/events");
        let delta = json!({"items": [{
            "categoryId": "goal",
            "categoryName": "Goal",
            "points": 5,
            "count": 2,
            "totalPoints": 10,
        }]});

        // Deltas wait for a roster.
        let (status, _) = send(&app, Method::POST, &events, Some(delta.clone())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let participants = format!("/api/day/sessions/{session}/participants");
        let (status, _) = send(&app, Method::PUT, &participants, Some(json!({"participants": [ana]}))).await;
        assert_eq!(status, StatusCode::OK);

        let bruno_events = format!("/api/day/sessions/{session}/players/{bruno}/events");
        let (status, _) = send(&app, Method::POST, &bruno_events, Some(delta.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, applied) = send(&app, Method::POST, &events, Some(delta)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(applied["applied"], 10);

        let (_, listed) = send(&app, Method::GET, &events, None).await;
        let event_id = listed[0]["id"].as_str().unwrap().to_string();
        let (status, _) = send(
            &app,
            Method::PATCH,
            &format!("{events}/{event_id}"),
            Some(json!({"count": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, summary) = send(&app, Method::GET, &format!("{events}/summary"), None).await;
        assert_eq!(summary["totalPoints"], 5);

        let (status, finalized) = send(
            &app,
            Method::POST,
            &format!("/api/day/sessions/{session}/finalize"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(finalized["bestUpdated"], 1);
        assert_eq!(finalized["badUpdated"], 1);

        let (status, _) = send(&app, Method::DELETE, &format!("{events}/{event_id}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, board) = send(&app, Method::GET, "/api/leaderboard?by=best", None).await;
        assert_eq!(board[0]["playerId"], ana.as_str());
        assert_eq!(board[0]["value"], 1);

        let (_, preview) = send(&app, Method::GET, "/api/day/revert/preview", None).await;
        assert_eq!(preview["bestCount"], 1);

        let (status, reverted) = send(&app, Method::POST, "/api/day/revert", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reverted["playersUpdated"], 1);

        let (_, day) = send(&app, Method::GET, "/api/day", None).await;
        assert_eq!(day["state"], "idle");
        assert_eq!(day["lastParticipants"], json!([ana]));
    }

    #[tokio::test]
    async fn test_unknown_player_is_not_found() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/players/ghost",
            Some(json!({"name": "Ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Resource not found");
    }

    #[tokio::test]
    async fn test_unknown_leaderboard_is_bad_request() {
        let (status, body) = send(&app(), Method::GET, "/api/leaderboard?by=goals", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let (status, doc) = send(&app(), Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/api/day/start"].is_object());
    }
}
