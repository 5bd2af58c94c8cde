//! Review models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub comment: Option<String>,
    pub comment_date: String,
    pub grade: f64,
    pub is_active: bool,
    pub user_id: i64,
    pub product_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub comment: Option<String>,
    pub grade: f64,
    pub product_id: i64,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub async fn find_review_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM reviews WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn insert_review(
    conn: &mut SqliteConnection,
    user_id: i64,
    req: &CreateReviewRequest,
) -> Result<Review, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query_as(
        r#"
        INSERT INTO reviews (comment, comment_date, grade, user_id, product_id)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&req.comment)
    .bind(&now)
    .bind(req.grade)
    .bind(user_id)
    .bind(req.product_id)
    .fetch_one(conn)
    .await
}

/// Flip `is_active` off. Returns whether the review was active before.
pub async fn deactivate_review(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE reviews SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Distinct products that have at least one active review by `user_id`.
pub async fn reviewed_product_ids(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT DISTINCT product_id FROM reviews WHERE user_id = ? AND is_active = 1",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
