//! Product models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Price in minor currency units
    pub price: i64,
    pub image_url: String,
    pub stock: i64,
    /// Mean grade of active reviews, maintained by `catalog::rating`
    pub rating: f64,
    pub category_id: i64,
    pub supplier_id: Option<i64>,
    pub is_active: bool,
}

/// Body for both creating and updating a product
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub image_url: String,
    pub stock: i64,
    /// Category id
    pub category: i64,
}

pub async fn find_product_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_product_by_slug(
    conn: &mut SqliteConnection,
    slug: &str,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE slug = ?")
        .bind(slug)
        .fetch_optional(conn)
        .await
}
