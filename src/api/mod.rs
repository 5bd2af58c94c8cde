pub mod auth;
mod categories;
pub mod error;
pub mod error_log;
pub mod hosts;
pub mod metrics;
mod products;
mod reviews;
pub mod tasks;
mod users;
pub mod validation;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let catalog_routes = Router::new()
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:slug",
            axum::routing::put(categories::update_category).delete(categories::delete_category),
        )
        // Products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/detail/:slug", get(products::product_detail))
        .route(
            "/products/:slug",
            get(products::products_by_category)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        // Reviews: the segment is a product slug for GET and a review id otherwise
        .route(
            "/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/reviews/:key",
            get(reviews::product_reviews)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        );

    let user_routes = Router::new()
        .route(
            "/users",
            get(users::list_users)
                .post(users::create_user)
                .delete(users::delete_user),
        )
        .route("/users/me", get(users::me))
        .route(
            "/permission/user_status/:user_id",
            patch(users::update_user_status),
        );

    let task_routes = Router::new()
        .route("/countdown", post(tasks::countdown))
        .route("/eta/:time_delta", post(tasks::eta))
        .route("/schedule", post(tasks::schedule));

    let error_routes = Router::new()
        .route("/logs", get(error_log::list_logs))
        .route("/test", post(error_log::generate_error));

    Router::new()
        .route("/health_check", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .route("/auth/token", post(auth::login))
        .merge(catalog_routes)
        .merge(user_routes)
        .nest("/tasks", task_routes)
        .nest("/errors", error_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error_log::error_log_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            hosts::trusted_host_middleware,
        ))
        .layer(cors_layer(&state.config.server))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins, with credentials allowed
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "message": "Shopfront e-commerce API" }))
}
