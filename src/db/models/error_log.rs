//! Error log models for failed HTTP responses.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Longest error message stored per row, in characters
pub const MAX_ERROR_MESSAGE_CHARS: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ErrorLog {
    pub id: i64,
    pub path: String,
    pub method: String,
    pub status_code: i64,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogListResponse {
    pub logs: Vec<ErrorLog>,
}

/// Cut `message` to at most [`MAX_ERROR_MESSAGE_CHARS`] characters on a char boundary.
pub fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// Append an error log row
pub async fn log_error(
    db: &SqlitePool,
    path: &str,
    method: &str,
    status_code: u16,
    message: &str,
) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let message = truncate_message(message);

    sqlx::query(
        r#"
        INSERT INTO error_logs (path, method, status_code, error_message, timestamp)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(path)
    .bind(method)
    .bind(i64::from(status_code))
    .bind(&message)
    .bind(&now)
    .execute(db)
    .await?;

    tracing::debug!(
        path = path,
        method = method,
        status_code = status_code,
        "Error log entry created"
    );

    Ok(())
}

pub async fn list_error_logs(db: &SqlitePool) -> Result<Vec<ErrorLog>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM error_logs ORDER BY id DESC")
        .fetch_all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_message_unchanged() {
        assert_eq!(truncate_message("Product not found"), "Product not found");
    }

    #[test]
    fn test_truncate_long_message() {
        let long = "x".repeat(400);
        assert_eq!(truncate_message(&long).chars().count(), MAX_ERROR_MESSAGE_CHARS);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "ошибка".repeat(60);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_MESSAGE_CHARS);
        assert!(long.starts_with(&truncated));
    }

    #[tokio::test]
    async fn test_log_and_list_errors() {
        let pool = crate::db::init_memory().await.unwrap();
        log_error(&pool, "/products/missing", "GET", 404, "Category not found")
            .await
            .unwrap();
        log_error(&pool, "/errors/test", "POST", 400, &"y".repeat(300))
            .await
            .unwrap();

        let logs = list_error_logs(&pool).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status_code, 400);
        assert_eq!(logs[0].error_message.len(), MAX_ERROR_MESSAGE_CHARS);
        assert_eq!(logs[1].path, "/products/missing");
        assert_eq!(logs[1].method, "GET");
    }
}
