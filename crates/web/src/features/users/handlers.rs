use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::user::{CreateUserRequest, UserProfileResponse, UserResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "List all users successfully", body = Vec<UserResponse>)
    ),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Response, WebError> {
    let users = services::list_users(state.store.as_ref()).await?;

    let response: Vec<UserResponse> = users
        .into_iter()
        .map(|user| UserResponse::from_user(user, &state.classifier))
        .collect();

    Ok(Json(response).into_response())
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User profile with rating history", body = UserProfileResponse),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let (user, history) = services::get_user_with_history(state.store.as_ref(), id).await?;

    Ok(Json(UserProfileResponse::new(user, history, &state.classifier)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Validation error")
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;
    req.validate()?;
    if req.name.trim().is_empty() {
        return Err(WebError::BadRequest("Name must not be blank".to_string()));
    }

    let user = services::create_user(state.store.as_ref(), &req).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_user(user, &state.classifier)),
    )
        .into_response())
}
