//! HTTP-facing error taxonomy.
//!
//! Every handler returns [`ApiResult`]. The variant decides the status code and
//! the message becomes the `detail` field of the JSON body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

pub const INVALID_DATE_MESSAGE: &str = "Invalid date format. Use YYYY-MM-DD.";
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing credentials";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDate,
    #[error("{0}")]
    LoginFailed(String),
    #[error("Invalid or missing credentials")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidDate | ApiError::LoginFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            // Internal causes may name files on the server.
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            error!("Request failed: {err:#}");
        }
        let status = self.status();
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
