use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    dto::contest::{
        ContestResponse, CreateContestRequest, EndContestRequest, EndContestResponse,
        PreviewResponse,
    },
    models::RatingHistoryEntry,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    get,
    path = "/api/contests",
    responses(
        (status = 200, description = "List all contests successfully", body = Vec<ContestResponse>)
    ),
    tag = "contests"
)]
pub async fn list_contests(State(state): State<AppState>) -> Result<Response, WebError> {
    let contests = services::list_contests(state.store.as_ref()).await?;

    let response: Vec<ContestResponse> = contests.into_iter().map(ContestResponse::from).collect();

    Ok(Json(response).into_response())
}

#[utoipa::path(
    post,
    path = "/api/contests",
    request_body = CreateContestRequest,
    responses(
        (status = 201, description = "Contest created successfully", body = ContestResponse),
        (status = 400, description = "Validation error")
    ),
    tag = "contests"
)]
pub async fn create_contest(
    State(state): State<AppState>,
    payload: Result<Json<CreateContestRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;
    req.validate()?;

    let contest = services::create_contest(state.store.as_ref(), &req).await?;

    Ok((StatusCode::CREATED, Json(ContestResponse::from(contest))).into_response())
}

#[utoipa::path(
    get,
    path = "/api/contests/{id}/results",
    params(
        ("id" = Uuid, Path, description = "Contest id")
    ),
    responses(
        (status = 200, description = "Rating changes of the contest ordered by rank", body = Vec<RatingHistoryEntry>),
        (status = 404, description = "Contest not found")
    ),
    tag = "contests"
)]
pub async fn get_contest_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let entries = services::get_contest_results(state.store.as_ref(), id).await?;

    Ok(Json(entries).into_response())
}

#[utoipa::path(
    post,
    path = "/api/contests/end",
    request_body = EndContestRequest,
    responses(
        (status = 200, description = "Contest closed and ratings updated", body = EndContestResponse),
        (status = 400, description = "Invalid results"),
        (status = 404, description = "Contest or user not found"),
        (status = 409, description = "Contest already closed or being finalized"),
        (status = 500, description = "Rating computation or storage failure"),
        (status = 503, description = "Storage temporarily unavailable, safe to retry")
    ),
    tag = "contests"
)]
pub async fn end_contest(
    State(state): State<AppState>,
    payload: Result<Json<EndContestRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;
    req.validate()?;

    let response = services::end_contest(&state.processor, &state.classifier, &req).await?;

    Ok(Json(response).into_response())
}

#[utoipa::path(
    post,
    path = "/api/contests/preview",
    request_body = EndContestRequest,
    responses(
        (status = 200, description = "Rating changes the results would produce", body = PreviewResponse),
        (status = 400, description = "Invalid results"),
        (status = 404, description = "Contest or user not found"),
        (status = 409, description = "Contest already closed")
    ),
    tag = "contests"
)]
pub async fn preview_contest(
    State(state): State<AppState>,
    payload: Result<Json<EndContestRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(req) = payload?;
    req.validate()?;

    let response = services::preview_contest(&state.processor, &state.classifier, &req).await?;

    Ok(Json(response).into_response())
}
