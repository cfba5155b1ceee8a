use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use troc_engine::{EngineError, ValidationReason};
use troc_shared::protocol::ErrorBody;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not signed in")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(ValidationReason),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ServerError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Unauthenticated => ServerError::Unauthorized,
            EngineError::Forbidden(why) => ServerError::Forbidden(why.to_string()),
            EngineError::Validation(reason) => ServerError::Validation(reason),
            e @ EngineError::NotFound(..) => ServerError::NotFound(e.to_string()),
            EngineError::Store(e) => ServerError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message, code) = match &self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), None),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string(), None),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            ServerError::Validation(reason) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                self.to_string(),
                Some(reason.code().to_string()),
            ),
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: message,
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}
