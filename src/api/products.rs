//! Product endpoints.
//!
//! Listings only show products that are active, in stock and filed under an
//! active category. The detail lookup applies the same product filters.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::sync::Arc;
use tracing::info;

use super::auth::AdminOrSupplier;
use super::error::ApiError;
use super::validation::validate_product;
use crate::auth::Identity;
use crate::catalog::{resolve_descendant_ids, slugify};
use crate::db::{find_category_by_id, find_category_by_slug, find_product_by_slug, Product, ProductRequest};
use crate::AppState;

const AVAILABLE_PRODUCTS: &str = r#"
    SELECT p.* FROM products p
    JOIN categories c ON c.id = p.category_id
    WHERE p.is_active = 1 AND c.is_active = 1 AND p.stock > 0
"#;

/// GET /products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products: Vec<Product> = sqlx::query_as(&format!("{} ORDER BY p.id", AVAILABLE_PRODUCTS))
        .fetch_all(&state.db)
        .await?;

    Ok(Json(products))
}

/// GET /products/:slug
///
/// Products of the category and of every category below it.
pub async fn products_by_category(
    State(state): State<Arc<AppState>>,
    Path(category_slug): Path<String>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let mut conn = state.db.acquire().await?;
    let category = find_category_by_slug(&mut conn, &category_slug)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| ApiError::entity_not_found("Category"))?;

    let category_ids = resolve_descendant_ids(&mut conn, category.id).await?;

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(AVAILABLE_PRODUCTS);
    query.push(" AND p.category_id IN (");
    let mut ids = query.separated(", ");
    for id in &category_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY p.id");

    let products: Vec<Product> = query.build_query_as().fetch_all(&mut *conn).await?;

    Ok(Json(products))
}

/// GET /products/detail/:slug
pub async fn product_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let mut conn = state.db.acquire().await?;
    let product = find_product_by_slug(&mut conn, &slug)
        .await?
        .filter(|p| p.is_active && p.stock > 0)
        .ok_or_else(|| ApiError::entity_not_found("Product"))?;

    Ok(Json(product))
}

async fn ensure_category_exists(conn: &mut SqliteConnection, category_id: i64) -> Result<(), ApiError> {
    find_category_by_id(conn, category_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::entity_not_found("Category"))
}

/// Suppliers may only change products they supply; admins may change any.
fn ensure_can_manage(identity: &Identity, product: &Product) -> Result<(), ApiError> {
    if identity.is_admin || product.supplier_id == Some(identity.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You are not the supplier of this product"))
    }
}

/// POST /products
///
/// The caller becomes the product's supplier.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    AdminOrSupplier(identity): AdminOrSupplier,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    validate_product(&req)?;

    let mut conn = state.db.acquire().await?;
    ensure_category_exists(&mut conn, req.category).await?;

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products (name, slug, description, price, image_url, stock, rating, category_id, supplier_id)
        VALUES (?, ?, ?, ?, ?, ?, 0.0, ?, ?)
        RETURNING *
        "#,
    )
    .bind(req.name.trim())
    .bind(slugify(&req.name))
    .bind(&req.description)
    .bind(req.price)
    .bind(&req.image_url)
    .bind(req.stock)
    .bind(req.category)
    .bind(identity.id)
    .fetch_one(&mut *conn)
    .await?;

    info!(product_id = product.id, slug = %product.slug, supplier_id = identity.id, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/:slug
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    AdminOrSupplier(identity): AdminOrSupplier,
    Path(slug): Path<String>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    validate_product(&req)?;

    let mut tx = state.db.begin().await?;
    let product = find_product_by_slug(&mut tx, &slug)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Product"))?;
    ensure_can_manage(&identity, &product)?;
    ensure_category_exists(&mut tx, req.category).await?;

    let updated: Product = sqlx::query_as(
        r#"
        UPDATE products
        SET name = ?, slug = ?, description = ?, price = ?, image_url = ?, stock = ?, category_id = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(req.name.trim())
    .bind(slugify(&req.name))
    .bind(&req.description)
    .bind(req.price)
    .bind(&req.image_url)
    .bind(req.stock)
    .bind(req.category)
    .bind(product.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(product_id = updated.id, slug = %updated.slug, user_id = identity.id, "Product updated");

    Ok(Json(updated))
}

/// DELETE /products/:slug
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    AdminOrSupplier(identity): AdminOrSupplier,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.acquire().await?;
    let product = find_product_by_slug(&mut conn, &slug)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Product"))?;
    ensure_can_manage(&identity, &product)?;

    sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?")
        .bind(product.id)
        .execute(&mut *conn)
        .await?;

    info!(product_id = product.id, user_id = identity.id, "Product deactivated");

    Ok(StatusCode::NO_CONTENT)
}
