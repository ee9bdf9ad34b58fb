use std::time::Duration;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::features::{contests, health, users};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::handlers::list_users,
        users::handlers::get_user,
        users::handlers::create_user,
        contests::handlers::list_contests,
        contests::handlers::create_contest,
        contests::handlers::get_contest_results,
        contests::handlers::end_contest,
        contests::handlers::preview_contest,
    ),
    components(
        schemas(
            storage::dto::user::CreateUserRequest,
            storage::dto::user::UserResponse,
            storage::dto::user::UserProfileResponse,
            storage::dto::user::RatingHistoryResponse,
            storage::dto::contest::CreateContestRequest,
            storage::dto::contest::ContestResponse,
            storage::dto::contest::ContestSummary,
            storage::dto::contest::ContestResult,
            storage::dto::contest::EndContestRequest,
            storage::dto::contest::EndContestResponse,
            storage::dto::contest::ParticipantResultResponse,
            storage::dto::contest::PreviewEntry,
            storage::dto::contest::PreviewResponse,
            storage::models::ContestStatus,
            storage::models::RatingHistoryEntry,
            storage::services::Tier,
        )
    ),
    tags(
        (name = "users", description = "User profiles and rating history"),
        (name = "contests", description = "Contest creation and finalization"),
        (name = "health", description = "Liveness probe"),
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health))
        .nest("/api/users", users::routes())
        .nest("/api/contests", contests::routes())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use storage::MemoryStore;
    use storage::services::{BatchProcessorConfig, RatingEngine, TierClassifier};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            RatingEngine::default(),
            TierClassifier::default(),
            BatchProcessorConfig::default(),
        );
        router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_user(app: &Router, name: &str) -> String {
        let (status, body) = send(app, "POST", "/api/users", Some(json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_contest(app: &Router, total: i32) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/contests",
            Some(json!({ "name": "Weekly Round", "total_participants": total })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "open");
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_new_user_profile_has_default_rating_and_empty_history() {
        let app = app();
        let id = create_user(&app, "ada").await;

        let (status, body) = send(&app, "GET", &format!("/api/users/{id}"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_rating"], 1500);
        assert_eq!(body["max_rating"], 1500);
        assert_eq!(body["contests_played"], 0);
        assert_eq!(body["tier"], "Silver");
        assert_eq!(body["ratingHistory"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let uri = format!("/api/users/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app(), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_requests_are_400() {
        let app = app();

        let (status, body) = send(&app, "POST", "/api/users", Some(json!({ "name": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");

        let (status, _) = send(
            &app,
            "POST",
            "/api/contests",
            Some(json!({ "name": "Round", "total_participants": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", "/api/contests/end", Some(json!({ "contest_id": 7 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_end_contest_updates_profile_and_rejects_second_finalize() {
        let app = app();
        let user_id = create_user(&app, "ada").await;
        let contest_id = create_contest(&app, 10).await;
        let request = json!({
            "contest_id": contest_id,
            "results": [{ "user_id": user_id, "rank": 1 }]
        });

        let (status, body) = send(&app, "POST", "/api/contests/end", Some(request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contest"]["status"], "closed");
        assert_eq!(body["participants"][0]["entry"]["rating_change"], 128);

        let (status, profile) = send(&app, "GET", &format!("/api/users/{user_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["current_rating"], 1628);
        assert_eq!(profile["tier"], "Gold");
        assert_eq!(profile["contests_played"], 1);
        assert_eq!(profile["ratingHistory"][0]["contest"]["id"], contest_id.as_str());

        let (status, _) = send(&app, "POST", "/api/contests/end", Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, results) = send(&app, "GET", &format!("/api/contests/{contest_id}/results"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(results.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_rank_out_of_range_is_400_and_contest_stays_open() {
        let app = app();
        let user_id = create_user(&app, "ada").await;
        let contest_id = create_contest(&app, 10).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/contests/end",
            Some(json!({
                "contest_id": contest_id,
                "results": [{ "user_id": user_id, "rank": 11 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");

        let (_, contests) = send(&app, "GET", "/api/contests", None).await;
        assert_eq!(contests[0]["status"], "open");
    }

    #[tokio::test]
    async fn test_unknown_participant_is_404() {
        let app = app();
        let contest_id = create_contest(&app, 3).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/contests/end",
            Some(json!({
                "contest_id": contest_id,
                "results": [{ "user_id": uuid::Uuid::new_v4(), "rank": 1 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preview_reports_tiers_without_committing() {
        let app = app();
        let user_id = create_user(&app, "ada").await;
        let contest_id = create_contest(&app, 10).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/contests/preview",
            Some(json!({
                "contest_id": contest_id,
                "results": [{ "user_id": user_id, "rank": 1 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["participants"][0]["tier_before"], "Silver");
        assert_eq!(body["participants"][0]["tier_after"], "Gold");

        let (_, profile) = send(&app, "GET", &format!("/api/users/{user_id}"), None).await;
        assert_eq!(profile["current_rating"], 1500);
        assert_eq!(profile["ratingHistory"], json!([]));
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let (status, body) = send(&app(), "GET", "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/contests/end"].is_object());
    }
}
