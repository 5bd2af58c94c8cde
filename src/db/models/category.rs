//! Category models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub is_active: bool,
}

/// Body for both creating and updating a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

pub async fn find_category_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_category_by_slug(
    conn: &mut SqliteConnection,
    slug: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(conn)
        .await
}

/// Every `(id, parent_id)` edge of the category forest, active or not.
pub async fn list_category_edges(
    conn: &mut SqliteConnection,
) -> Result<Vec<(i64, Option<i64>)>, sqlx::Error> {
    sqlx::query_as("SELECT id, parent_id FROM categories")
        .fetch_all(conn)
        .await
}
