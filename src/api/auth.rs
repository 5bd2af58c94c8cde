//! Token issuing endpoint and the authentication extractors.
//!
//! Handlers declare what they need in their signature:
//! [`Identity`] for any signed-in user, [`AdminUser`] or [`AdminOrSupplier`]
//! when a role is required. The token is validated first and the role is
//! checked second, both before the handler body runs.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap},
    Form, Json,
};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{authenticate, require_admin, require_admin_or_supplier, AuthError, Identity};
use crate::db::{LoginRequest, TokenResponse};
use crate::AppState;

/// POST /auth/token
///
/// Form-encoded `username` and `password`; returns a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(request): Form<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut conn = state.db.acquire().await?;
    let user = authenticate(&mut conn, &request.username, &request.password)
        .await
        .map_err(|e| {
            if matches!(e, AuthError::InvalidCredentials) {
                tracing::info!(username = %request.username, "Rejected login attempt");
            }
            e
        })?;

    let access_token = state.tokens.issue_session(&user)?;
    tracing::info!(user_id = user.id, username = %user.username, "Issued session token");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for the identity carried by a valid session token
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        Ok(state.tokens.validate(token)?)
    }
}

/// A signed-in user with the admin flag
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        Ok(AdminUser(require_admin(identity)?))
    }
}

/// A signed-in user with the admin or supplier flag
#[derive(Debug, Clone)]
pub struct AdminOrSupplier(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminOrSupplier {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state).await?;
        Ok(AdminOrSupplier(require_admin_or_supplier(identity)?))
    }
}
