//! User account models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_supplier: bool,
    pub is_customer: bool,
    pub created_at: String,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_supplier: bool,
    pub is_customer: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            is_admin: user.is_admin,
            is_supplier: user.is_supplier,
            is_customer: user.is_customer,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Role flags an admin may assign to another user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserStatusUpdate {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_supplier: bool,
    #[serde(default)]
    pub is_customer: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

pub async fn find_user_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(conn)
        .await
}

/// Insert a user row and return it. `password_hash` must already be hashed.
pub async fn insert_user(
    conn: &mut SqliteConnection,
    req: &CreateUserRequest,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query_as(
        r#"
        INSERT INTO users (first_name, last_name, username, email, password_hash, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.username)
    .bind(&req.email)
    .bind(password_hash)
    .bind(&now)
    .fetch_one(conn)
    .await
}
