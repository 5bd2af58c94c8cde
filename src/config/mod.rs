use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Origins allowed by the CORS layer. Empty means no cross-origin access.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Hosts accepted in the `Host` header. Entries may start with `*.` to
    /// match any subdomain. Empty disables the check.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            cors_origins: default_cors_origins(),
            allowed_hosts: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_database_url() -> String {
    "sqlite:./data/shopfront.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://127.0.0.1:8000".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Symmetric signing secret for session tokens. Required at startup.
    pub secret_key: Option<String>,
    /// JWT signing algorithm name (HS256, HS384 or HS512)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Session token lifetime in minutes
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            algorithm: default_algorithm(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Periodic tasks dispatched by the beat scheduler
    #[serde(default)]
    pub beat: Vec<BeatEntry>,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            beat: Vec::new(),
        }
    }
}

fn default_queue_capacity() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeatEntry {
    pub task: String,
    #[serde(default)]
    pub message: Option<String>,
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            tasks: TasksConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.algorithm, "HS256");
        assert_eq!(config.auth.token_ttl_minutes, 30);
        assert!(config.auth.secret_key.is_none());
        assert_eq!(config.tasks.queue_capacity, 100);
        assert!(config.tasks.beat.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9000
            allowed_hosts = ["example.com", "*.example.com"]

            [auth]
            secret_key = "s3cret"
            algorithm = "HS512"
            token_ttl_minutes = 20

            [[tasks.beat]]
            task = "high_priority"
            message = "Test text message"
            interval_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.allowed_hosts.len(), 2);
        assert_eq!(config.auth.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(config.auth.algorithm, "HS512");
        assert_eq!(config.auth.token_ttl_minutes, 20);
        assert_eq!(config.tasks.beat.len(), 1);
        assert_eq!(config.tasks.beat[0].interval_seconds, 30);
    }
}
