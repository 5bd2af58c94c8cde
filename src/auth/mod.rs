//! Session authentication: credential checks and signed session tokens.
//!
//! Tokens are HMAC-signed JWTs that embed the user's identity and role flags.
//! Validation trusts the payload and never re-reads the user row, so a change
//! to a user's roles becomes visible only once their current token expires.

pub mod gate;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::config::AuthConfig;
use crate::db::{find_user_by_username, User};

pub use gate::{require_admin, require_admin_or_supplier};
pub use password::{hash_password, verify_dummy_password, verify_password};

/// Errors produced while authenticating users or handling their tokens
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid authentication credentials")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Token has expired")]
    Expired,

    #[error("Token expiry claim is missing or not an integer")]
    MalformedToken,

    #[error("Not authenticated")]
    MissingToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid token configuration: {0}")]
    Config(String),

    #[error("Failed to create token: {0}")]
    TokenCreation(String),

    #[error("Failed to hash password: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Decoded, verified payload of a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_supplier: bool,
    pub is_customer: bool,
    /// Expiry as Unix seconds
    pub exp: i64,
}

impl Identity {
    fn for_user(user: &User, exp: i64) -> Self {
        Self {
            username: user.username.clone(),
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            is_admin: user.is_admin,
            is_supplier: user.is_supplier,
            is_customer: user.is_customer,
            exp,
        }
    }
}

/// Signing parameters, built once at startup
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, algorithm: Algorithm, ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::Config("secret key must not be empty".to_string()));
        }
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Config(format!(
                "algorithm {:?} is not a symmetric HMAC algorithm",
                algorithm
            )));
        }
        if ttl <= Duration::zero() {
            return Err(AuthError::Config("token lifetime must be positive".to_string()));
        }
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(AuthError::Config("token lifetime is out of range".to_string()));
        }
        Ok(Self { secret, algorithm, ttl })
    }

    /// Build from the `[auth]` section; fails when the secret is absent.
    pub fn from_auth_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let secret = config
            .secret_key
            .clone()
            .ok_or_else(|| AuthError::Config("auth.secret_key is not set".to_string()))?;
        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| AuthError::Config(format!("unknown algorithm {}", config.algorithm)))?;
        let ttl = Duration::try_minutes(config.token_ttl_minutes)
            .ok_or_else(|| AuthError::Config("token lifetime is out of range".to_string()))?;
        Self::new(secret, algorithm, ttl)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Sign a token for `user` that expires `ttl` from now.
    pub fn issue(&self, user: &User, ttl: Duration) -> Result<String, AuthError> {
        let exp = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::TokenCreation("token expiry is out of range".to_string()))?
            .timestamp();
        let claims = Identity::for_user(user, exp);

        encode(&Header::new(self.config.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Sign a token with the configured session lifetime.
    pub fn issue_session(&self, user: &User) -> Result<String, AuthError> {
        self.issue(user, self.config.ttl)
    }

    /// Verify the signature and expiry of `token` and return its identity.
    pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        // Expiry is checked by hand below so that a missing or non-integer
        // `exp` can be told apart from an expired one.
        let mut validation = Validation::new(self.config.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<serde_json::Value>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            AuthError::InvalidToken
        })?;

        let exp = data
            .claims
            .get("exp")
            .and_then(serde_json::Value::as_i64)
            .ok_or(AuthError::MalformedToken)?;
        if exp < Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        serde_json::from_value(data.claims).map_err(|_| AuthError::InvalidToken)
    }
}

/// Check a username/password pair against the stored credentials.
///
/// Unknown users, wrong passwords and deactivated accounts all fail the same way.
pub async fn authenticate(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let Some(user) = find_user_by_username(conn, username).await? else {
        // Spend the same hashing work as a real check
        verify_dummy_password(password);
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash) || !user.is_active {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{init_memory, insert_user, CreateUserRequest};

    pub(crate) fn test_service() -> TokenService {
        TokenService::new(
            TokenConfig::new("test-secret", Algorithm::HS256, Duration::minutes(30)).unwrap(),
        )
    }

    pub(crate) fn sample_user(is_admin: bool, is_supplier: bool) -> User {
        User {
            id: 7,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            is_active: true,
            is_admin,
            is_supplier,
            is_customer: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_issue_then_validate_round_trip() {
        let service = test_service();
        let user = sample_user(true, false);

        let token = service.issue_session(&user).unwrap();
        let identity = service.validate(&token).unwrap();

        assert_eq!(identity.id, user.id);
        assert_eq!(identity.username, "ada");
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.is_admin);
        assert!(!identity.is_supplier);
        assert!(identity.is_customer);
        assert!(identity.is_active);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = test_service();
        let token = service
            .issue(&sample_user(false, false), Duration::minutes(-5))
            .unwrap();

        assert!(matches!(service.validate(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenService::new(
            TokenConfig::new("another-secret", Algorithm::HS256, Duration::minutes(30)).unwrap(),
        );
        let token = other.issue_session(&sample_user(false, false)).unwrap();

        assert!(matches!(
            test_service().validate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            test_service().validate("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "username": "ada", "id": 7 }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            test_service().validate(&token),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_non_integer_exp_is_malformed() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "username": "ada", "id": 7, "exp": "tomorrow" }),
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            test_service().validate(&token),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_token_config_requires_secret() {
        let config = AuthConfig::default();
        assert!(matches!(
            TokenConfig::from_auth_config(&config),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_token_config_rejects_out_of_range_lifetime() {
        let config = AuthConfig {
            secret_key: Some("secret".to_string()),
            algorithm: "HS256".to_string(),
            token_ttl_minutes: i64::MAX,
        };
        assert!(matches!(
            TokenConfig::from_auth_config(&config),
            Err(AuthError::Config(_))
        ));

        let too_long = Duration::try_days(100_000_000).unwrap();
        assert!(matches!(
            TokenConfig::new("secret", Algorithm::HS256, too_long),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_issue_rejects_out_of_range_expiry() {
        let too_long = Duration::try_days(100_000_000).unwrap();
        assert!(matches!(
            test_service().issue(&sample_user(false, false), too_long),
            Err(AuthError::TokenCreation(_))
        ));
    }

    #[test]
    fn test_token_config_rejects_asymmetric_algorithm() {
        let config = AuthConfig {
            secret_key: Some("secret".to_string()),
            algorithm: "RS256".to_string(),
            token_ttl_minutes: 30,
        };
        assert!(matches!(
            TokenConfig::from_auth_config(&config),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_token_config_debug_hides_secret() {
        let config = TokenConfig::new("hunter2", Algorithm::HS512, Duration::minutes(20)).unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let pool = init_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let req = CreateUserRequest {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            username: "grace".to_string(),
            email: "grace@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        let hash = hash_password(&req.password).unwrap();
        let user = insert_user(&mut conn, &req, &hash).await.unwrap();

        let found = authenticate(&mut conn, "grace", "correct horse").await.unwrap();
        assert_eq!(found.id, user.id);

        assert!(matches!(
            authenticate(&mut conn, "grace", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&mut conn, "nobody", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));

        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(user.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        assert!(matches!(
            authenticate(&mut conn, "grace", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
