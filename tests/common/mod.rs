//! Shared setup for the HTTP-level tests.

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use shopfront::auth::{TokenConfig, TokenService};
use shopfront::config::Config;
use shopfront::tasks::{TaskDispatcher, TaskWorker};
use shopfront::{AppState, DbPool};

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub db: DbPool,
    /// Kept alive so the task queue stays open
    _worker: TaskWorker,
}

pub async fn setup_test_app() -> TestApp {
    let mut config = Config::default();
    config.auth.secret_key = Some("integration-test-secret".to_string());

    let db = shopfront::db::init_memory().await.unwrap();
    let tokens = TokenService::new(
        TokenConfig::new("integration-test-secret", Algorithm::HS256, chrono::Duration::minutes(30))
            .unwrap(),
    );
    let (dispatcher, worker) = TaskDispatcher::channel(16);

    let state = Arc::new(AppState::new(config, db.clone(), tokens, dispatcher));

    TestApp {
        router: shopfront::api::create_router(state),
        db,
        _worker: worker,
    }
}

impl TestApp {
    /// Send a request and return the status with the decoded JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Register `username` and return the new user's id
    pub async fn register(&self, username: &str) -> i64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "first_name": "Test",
                    "last_name": username,
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    pub async fn login(&self, username: &str) -> String {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={}&password={}", username, PASSWORD)))
            .unwrap();
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Register a user with the given role flags and return `(id, token)`
    pub async fn user_with_roles(&self, username: &str, is_admin: bool, is_supplier: bool) -> (i64, String) {
        let id = self.register(username).await;
        sqlx::query("UPDATE users SET is_admin = ?, is_supplier = ? WHERE id = ?")
            .bind(is_admin)
            .bind(is_supplier)
            .bind(id)
            .execute(&self.db)
            .await
            .unwrap();
        (id, self.login(username).await)
    }
}
