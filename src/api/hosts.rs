//! Trusted host filtering.
//!
//! With `server.allowed_hosts` empty every host is accepted. Otherwise the
//! request's `Host` header (port ignored) has to match one of the patterns:
//! `*` matches anything, `*.example.com` matches any subdomain of
//! `example.com`, anything else must match exactly (case-insensitive).

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::ApiError;
use crate::AppState;

/// Host part of a `Host` header value, without the port
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: [::1]:8000
        return host.split_once(']').map_or(host, |(h, _)| &h[1..]);
    }
    host.rsplit_once(':').map_or(host, |(h, _)| h)
}

pub fn host_matches(pattern: &str, host: &str) -> bool {
    let host = strip_port(host).to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    if pattern == "*" {
        return true;
    }
    if let Some(domain) = pattern.strip_prefix("*.") {
        return host
            .strip_suffix(domain)
            .map_or(false, |rest| rest.ends_with('.') && rest.len() > 1);
    }
    host == pattern
}

pub async fn trusted_host_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = &state.config.server.allowed_hosts;
    if allowed.is_empty() {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or("");

    if allowed.iter().any(|pattern| host_matches(pattern, host)) {
        next.run(request).await
    } else {
        tracing::debug!(host = host, "Rejected request for untrusted host");
        ApiError::bad_request("Invalid host header").into_response()
    }
}
