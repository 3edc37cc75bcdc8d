use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const GENERIC_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    // This enables using `?` on functions that return
    // `Result<_, anyhow::Error>` inside handlers.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The full text of an internal error, parked on the response so that
/// [`crate::middleware::error_detail`] can decide whether the client gets to
/// see it.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Internal(err) => {
                error!("{:?}", err);
                let mut response = (
                    status,
                    Json(json!({ "success": false, "message": GENERIC_MESSAGE })),
                )
                    .into_response();
                response
                    .extensions_mut()
                    .insert(ErrorDetail(format!("{:#}", err)));
                response
            }
            other => (
                status,
                Json(json!({ "success": false, "message": other.to_string() })),
            )
                .into_response(),
        }
    }
}
