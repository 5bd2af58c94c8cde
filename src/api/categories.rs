//! Category endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::info;

use super::auth::AdminUser;
use super::error::ApiError;
use super::validation::validate_category;
use crate::catalog::{resolve_descendant_ids, slugify};
use crate::db::{find_category_by_id, find_category_by_slug, Category, CategoryRequest};
use crate::AppState;

/// GET /categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories: Vec<Category> =
        sqlx::query_as("SELECT * FROM categories WHERE is_active = 1 ORDER BY id")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(categories))
}

/// Make sure `parent_id` names an existing category that is not `category_id`
/// itself or one of its descendants.
async fn check_parent(
    conn: &mut SqliteConnection,
    category_id: Option<i64>,
    parent_id: Option<i64>,
) -> Result<(), ApiError> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };

    if find_category_by_id(conn, parent_id).await?.is_none() {
        return Err(ApiError::entity_not_found("Parent category"));
    }

    if let Some(category_id) = category_id {
        if resolve_descendant_ids(conn, category_id)
            .await?
            .contains(&parent_id)
        {
            return Err(ApiError::validation_field(
                "parent_id",
                "A category cannot be moved under itself or one of its subcategories",
            ));
        }
    }

    Ok(())
}

/// POST /categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    validate_category(&req)?;

    let mut conn = state.db.acquire().await?;
    check_parent(&mut conn, None, req.parent_id).await?;

    let slug = slugify(&req.name);
    let category: Category = sqlx::query_as(
        "INSERT INTO categories (name, slug, parent_id) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(req.name.trim())
    .bind(&slug)
    .bind(req.parent_id)
    .fetch_one(&mut *conn)
    .await?;

    info!(category_id = category.id, slug = %category.slug, admin_id = admin.id, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /categories/:slug
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(slug): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    validate_category(&req)?;

    let mut tx = state.db.begin().await?;
    let category = find_category_by_slug(&mut tx, &slug)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Category"))?;

    check_parent(&mut tx, Some(category.id), req.parent_id).await?;

    let updated: Category = sqlx::query_as(
        "UPDATE categories SET name = ?, slug = ?, parent_id = ? WHERE id = ? RETURNING *",
    )
    .bind(req.name.trim())
    .bind(slugify(&req.name))
    .bind(req.parent_id)
    .bind(category.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(category_id = updated.id, slug = %updated.slug, admin_id = admin.id, "Category updated");

    Ok(Json(updated))
}

/// DELETE /categories/:slug
///
/// Soft delete; subcategories are left untouched.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.db.acquire().await?;
    let category = find_category_by_slug(&mut conn, &slug)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Category"))?;

    sqlx::query("UPDATE categories SET is_active = 0 WHERE id = ?")
        .bind(category.id)
        .execute(&mut *conn)
        .await?;

    info!(category_id = category.id, admin_id = admin.id, "Category deactivated");

    Ok(StatusCode::NO_CONTENT)
}
