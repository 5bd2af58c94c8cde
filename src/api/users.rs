//! User account endpoints and the admin permission endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::auth::AdminUser;
use super::error::ApiError;
use super::validation::validate_create_user;
use crate::auth::{hash_password, Identity};
use crate::catalog::recompute_rating;
use crate::db::{
    find_user_by_id, insert_user, reviewed_product_ids, CreateUserRequest, User, UserResponse,
    UserStatusUpdate,
};
use crate::AppState;

impl From<Identity> for UserResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            first_name: identity.first_name,
            last_name: identity.last_name,
            username: identity.username,
            email: identity.email,
            is_active: identity.is_active,
            is_admin: identity.is_admin,
            is_supplier: identity.is_supplier,
            is_customer: identity.is_customer,
        }
    }
}

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_create_user(&req)?;

    let password_hash = hash_password(&req.password)?;
    let mut conn = state.db.acquire().await?;
    let user = insert_user(&mut conn, &req, &password_hash).await?;

    info!(user_id = user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE is_active = 1 ORDER BY id")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/me
///
/// Answers from the token alone; the database is not consulted.
pub async fn me(identity: Identity) -> Json<UserResponse> {
    Json(UserResponse::from(identity))
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserQuery {
    pub user_id: i64,
}

/// DELETE /users?user_id=N
///
/// Users may delete themselves; admins may delete anyone. The row is removed
/// together with the user's reviews, so the ratings of every product they
/// reviewed are recomputed in the same transaction.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<DeleteUserQuery>,
) -> Result<StatusCode, ApiError> {
    if query.user_id != identity.id && !identity.is_admin {
        return Err(ApiError::forbidden("You can only delete your own account"));
    }

    let mut tx = state.db.begin().await?;
    let user = find_user_by_id(&mut tx, query.user_id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("User"))?;

    let product_ids = reviewed_product_ids(&mut tx, user.id).await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    for product_id in &product_ids {
        recompute_rating(&mut tx, *product_id).await?;
    }
    tx.commit().await?;

    info!(
        user_id = user.id,
        deleted_by = identity.id,
        recomputed_products = product_ids.len(),
        "User deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /permission/user_status/:user_id
///
/// Role changes apply to tokens issued afterwards.
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
    Json(update): Json<UserStatusUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    let user: User = sqlx::query_as(
        "UPDATE users SET is_admin = ?, is_supplier = ?, is_customer = ? WHERE id = ? RETURNING *",
    )
    .bind(update.is_admin)
    .bind(update.is_supplier)
    .bind(update.is_customer)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::entity_not_found("User"))?;

    info!(
        user_id = user.id,
        admin_id = admin.id,
        is_admin = user.is_admin,
        is_supplier = user.is_supplier,
        is_customer = user.is_customer,
        "User permissions updated"
    );

    Ok(Json(UserResponse::from(user)))
}
