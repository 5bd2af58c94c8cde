//! Error log middleware and endpoints.
//!
//! Every response with a 4xx or 5xx status is recorded in the `error_logs`
//! table. The client receives the response unchanged.

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use super::auth::AdminUser;
use super::error::ApiError;
use crate::db::{list_error_logs, log_error, ErrorLogListResponse};
use crate::AppState;

/// Pick the human-readable message out of an error response body.
///
/// Prefers `error.message` from the JSON error envelope, then the raw body
/// text, then the status reason phrase.
pub fn error_message_from_body(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}

pub async fn error_log_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "Failed to buffer error response body");
            Default::default()
        }
    };

    let message = error_message_from_body(status, &bytes);
    if let Err(e) = log_error(&state.db, &path, &method, status.as_u16(), &message).await {
        tracing::warn!(error = %e, path = %path, "Failed to write error log entry");
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// GET /errors/logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<ErrorLogListResponse>, ApiError> {
    let logs = list_error_logs(&state.db).await?;
    Ok(Json(ErrorLogListResponse { logs }))
}

/// POST /errors/test
///
/// Always fails with 400 so the error log can be checked end to end.
pub async fn generate_error() -> ApiError {
    ApiError::bad_request("Test error")
}
