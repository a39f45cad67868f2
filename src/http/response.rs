//! Response bodies and error mapping.
//!
//! # Responsibilities
//! - Map handler errors to HTTP status codes
//! - Render every body, errors included, as JSON
//!
//! # Design Decisions
//! - Transport failures never reach this module; they are part of a 200
//!   check result
//! - Content-Type and nosniff headers are set once by the router layers

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::checker::CheckError;

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request, rejected before any network activity.
    #[error(transparent)]
    Validation(CheckError),

    /// Body could not be read, e.g. it exceeded the size limit.
    #[error(transparent)]
    Payload(#[from] BytesRejection),

    #[error("failed to serialize check result: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("no route for {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Payload(rejection) => rejection.status(),
            ApiError::Serialization(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// `{"status": ...}` body used by the health and ping routes.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
}

impl StatusBody {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }

    pub fn bad() -> Self {
        Self { status: "bad" }
    }

    pub fn pong() -> Self {
        Self { status: "pong!" }
    }
}
