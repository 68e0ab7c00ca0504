//! API error responses.
//!
//! Every failure leaves the server as `{ "error": ..., "details": ... }` with a
//! matching status code.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use brandkit_core::StoreError;
use brandkit_renderer::RenderError;
use serde::Serialize;
use thiserror::Error;

use crate::metrics;
use crate::validation::ValidationError;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Short summary.
    pub error: &'static str,
    /// What went wrong.
    pub details: String,
}

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Repository failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Rendering or packaging failure.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(ValidationError::Body(rejection.body_text()))
    }
}

impl ApiError {
    fn status_and_summary(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            Self::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "Project not found"),
            Self::Store(StoreError::AlreadyExists(_)) => {
                (StatusCode::CONFLICT, "Project already exists")
            }
            Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage failure"),
            Self::Render(RenderError::Font { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load font")
            }
            Self::Render(RenderError::TiersExhausted(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate image")
            }
            Self::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate assets"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_summary();
        if let Self::Validation(ref err) = self {
            metrics::record_validation_failure(err.kind());
        }
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        let body = ErrorBody {
            error,
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
