//! Review endpoints.
//!
//! Every write that can change the set of active grades for a product
//! recomputes the product's rating inside the same transaction.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::auth::AdminUser;
use super::error::ApiError;
use super::validation::{validate_create_review, validate_update_review};
use crate::auth::Identity;
use crate::catalog::recompute_rating;
use crate::db::{
    deactivate_review, find_product_by_id, find_product_by_slug, find_review_by_id, insert_review,
    CreateReviewRequest, Review, UpdateReviewRequest,
};
use crate::AppState;

/// GET /reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews: Vec<Review> = sqlx::query_as("SELECT * FROM reviews WHERE is_active = 1 ORDER BY id")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(reviews))
}

/// GET /reviews/:product_slug
pub async fn product_reviews(
    State(state): State<Arc<AppState>>,
    Path(product_slug): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let mut conn = state.db.acquire().await?;
    let product = find_product_by_slug(&mut conn, &product_slug)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::entity_not_found("Product"))?;

    let reviews: Vec<Review> = sqlx::query_as(
        "SELECT * FROM reviews WHERE product_id = ? AND is_active = 1 ORDER BY id",
    )
    .bind(product.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(reviews))
}

/// POST /reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    validate_create_review(&req)?;

    let mut tx = state.db.begin().await?;
    find_product_by_id(&mut tx, req.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::entity_not_found("Product"))?;

    let review = insert_review(&mut tx, identity.id, &req).await?;
    let rating = recompute_rating(&mut tx, review.product_id).await?;
    tx.commit().await?;

    info!(
        review_id = review.id,
        product_id = review.product_id,
        user_id = identity.id,
        rating = rating,
        "Review created"
    );

    Ok((StatusCode::CREATED, Json(review)))
}

/// PATCH /reviews/:id
///
/// Open to the review's author and to admins.
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(review_id): Path<i64>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    validate_update_review(&req)?;

    let mut tx = state.db.begin().await?;
    let review = find_review_by_id(&mut tx, review_id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Review"))?;

    if review.user_id != identity.id && !identity.is_admin {
        return Err(ApiError::forbidden("You can only edit your own reviews"));
    }

    let comment = req.comment.clone().or_else(|| review.comment.clone());
    let grade = req.grade.unwrap_or(review.grade);
    let is_active = req.is_active.unwrap_or(review.is_active);

    // Reactivation undoes moderation and is reserved for admins
    if is_active && !review.is_active {
        if !identity.is_admin {
            return Err(ApiError::forbidden("Only admins can restore a deleted review"));
        }
        find_product_by_id(&mut tx, review.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ApiError::entity_not_found("Product"))?;
    }

    let updated: Review = sqlx::query_as(
        "UPDATE reviews SET comment = ?, grade = ?, is_active = ? WHERE id = ? RETURNING *",
    )
    .bind(&comment)
    .bind(grade)
    .bind(is_active)
    .bind(review.id)
    .fetch_one(&mut *tx)
    .await?;

    if updated.grade != review.grade || updated.is_active != review.is_active {
        recompute_rating(&mut tx, updated.product_id).await?;
    }
    tx.commit().await?;

    info!(review_id = updated.id, user_id = identity.id, "Review updated");

    Ok(Json(updated))
}

/// DELETE /reviews/:id
///
/// Soft delete. Deleting an already inactive review is a no-op.
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(review_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let mut tx = state.db.begin().await?;
    let review = find_review_by_id(&mut tx, review_id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Review"))?;

    if deactivate_review(&mut tx, review.id).await? {
        recompute_rating(&mut tx, review.product_id).await?;
    }
    tx.commit().await?;

    info!(review_id = review.id, admin_id = admin.id, "Review deactivated");

    Ok(StatusCode::NO_CONTENT)
}
