use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use storage::error::StorageError;
use storage::services::FinalizeError;
use validator::ValidationErrors;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Finalize(FinalizeError),
    Validation(ValidationErrors),
    BadRequest(String),
    NotFound(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Finalize(e) => write!(f, "Finalization error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::NotFound(what) => write!(f, "{} not found", what),
        }
    }
}

impl WebError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::ConstraintViolation(_) | StorageError::StaleSnapshot(_)) => {
                StatusCode::CONFLICT
            }
            Self::Storage(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Finalize(FinalizeError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Finalize(FinalizeError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Finalize(FinalizeError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Finalize(FinalizeError::Computation(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Finalize(e @ FinalizeError::Persistence(_)) if e.is_retryable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Finalize(FinalizeError::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let body = match &self {
            Self::Storage(StorageError::NotFound) => json!({ "error": "Resource not found" }),
            Self::Storage(StorageError::ConstraintViolation(msg) | StorageError::StaleSnapshot(msg)) => {
                json!({ "error": msg })
            }
            Self::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                json!({ "error": "An internal error occurred" })
            }
            Self::Finalize(FinalizeError::Validation(msg)) => json!({
                "error": "Validation failed",
                "details": [msg]
            }),
            Self::Finalize(e @ (FinalizeError::NotFound(_) | FinalizeError::Conflict(_))) => {
                json!({ "error": e.to_string() })
            }
            Self::Finalize(e) => {
                tracing::error!("Finalization error: {:?}", e);
                json!({
                    "error": "Contest could not be finalized",
                    "details": [e.to_string()]
                })
            }
            Self::Validation(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            format!(
                                "{}: {}",
                                field,
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            )
                        })
                    })
                    .collect();

                json!({
                    "error": "Validation failed",
                    "details": field_errors
                })
            }
            Self::BadRequest(msg) => json!({ "error": msg }),
            Self::NotFound(what) => json!({ "error": format!("{what} not found") }),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<FinalizeError> for WebError {
    fn from(error: FinalizeError) -> Self {
        Self::Finalize(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_finalize_errors_map_to_status_codes() {
        let cases = [
            (FinalizeError::Validation("rank".into()), StatusCode::BAD_REQUEST),
            (FinalizeError::NotFound("user".into()), StatusCode::NOT_FOUND),
            (FinalizeError::Conflict("closed".into()), StatusCode::CONFLICT),
            (
                FinalizeError::Persistence(StorageError::Timeout(Duration::from_secs(5))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                FinalizeError::Persistence(StorageError::ConstraintViolation("dup".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(WebError::from(error).into_response().status(), expected);
        }
    }

    #[test]
    fn test_storage_not_found_is_404() {
        let response = WebError::from(StorageError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
