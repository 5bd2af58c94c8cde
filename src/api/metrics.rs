//! Prometheus metrics: the `/metrics` endpoint, the request tracking
//! middleware and the metric names used across the crate.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const RATING_RECOMPUTATIONS_TOTAL: &str = "rating_recomputations_total";
pub const TASKS_TOTAL: &str = "tasks_total";
pub const PRODUCTS_ACTIVE: &str = "products_active";
pub const USERS_ACTIVE: &str = "users_active";

/// Install the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        RATING_RECOMPUTATIONS_TOTAL,
        "Number of product rating recomputations"
    );
    describe_counter!(TASKS_TOTAL, "Background tasks by task name and status");
    describe_gauge!(PRODUCTS_ACTIVE, "Number of active products");
    describe_gauge!(USERS_ACTIVE, "Number of active user accounts");

    Ok(handle)
}

/// GET /metrics
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    update_gauge_metrics(&state).await;

    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not initialized".to_string(),
        ),
    }
}

async fn update_gauge_metrics(state: &AppState) {
    if let Ok(count) =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&state.db)
            .await
    {
        gauge!(PRODUCTS_ACTIVE).set(count as f64);
    }

    if let Ok(count) = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_active = 1")
        .fetch_one(&state.db)
        .await
    {
        gauge!(USERS_ACTIVE).set(count as f64);
    }
}

/// Count every request and record its duration, labelled by route template.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Route template (e.g. /products/:slug) keeps label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}
