use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{create_contest, end_contest, get_contest_results, list_contests, preview_contest};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contests).post(create_contest))
        .route("/end", post(end_contest))
        .route("/preview", post(preview_contest))
        .route("/:id/results", get(get_contest_results))
}
