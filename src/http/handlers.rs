//! Route handlers.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use crate::checker::{CheckError, CheckRequest, Target};
use crate::http::response::{ApiError, StatusBody};
use crate::http::server::AppState;
use crate::observability::metrics;

/// `POST /`: check the submitted URL and report the result.
///
/// The check runs on its own task, so a caller that disconnects does not
/// cancel it or its alert dispatch.
pub async fn check_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body?;
    let target = CheckRequest::from_slice(&body)
        .and_then(|request| request.target())
        .map_err(ApiError::Validation)?;

    tracing::debug!(url = %target.link(), "Check requested");

    tokio::spawn(run_check(state, target))
        .await
        .map_err(|e| ApiError::Internal(format!("check task failed: {e}")))?
}

async fn run_check(state: AppState, target: Target) -> Result<Response, ApiError> {
    let outcome = state.checker.check(&target).await;
    let result = &outcome.result;

    metrics::record_check(
        result.status_code,
        outcome.error.as_ref().map(CheckError::kind),
        result.response_time_millis,
    );

    let payload = serde_json::to_string(result)?;
    if let Some(alert) = state.dispatch.classify(result, &payload) {
        tracing::info!(url = %alert.link, status = alert.status, "Failure detected");
        state.dispatch.submit(alert).await;
    }

    Ok((StatusCode::OK, payload).into_response())
}

/// `GET /health`: reflects the readiness flag.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.health.is_healthy() {
        (StatusCode::OK, Json(StatusBody::ok()))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(StatusBody::bad()))
    }
}

/// `GET /ping`: liveness echo.
pub async fn ping_handler() -> Json<StatusBody> {
    Json(StatusBody::pong())
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
