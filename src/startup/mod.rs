//! Startup self-checks
//!
//! Run once before the server accepts requests. A failed critical check
//! aborts startup:
//! - Token signing configuration
//! - Database connectivity and schema
//! - Periodic task entries (non-critical)

use serde::Serialize;
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::auth::TokenConfig;
use crate::config::Config;
use crate::tasks::TaskKind;
use crate::DbPool;

/// Tables the handlers expect to exist
const ESSENTIAL_TABLES: [&str; 5] = ["users", "categories", "products", "reviews", "error_logs"];

/// Result of a single startup check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    /// Failure aborts startup
    pub critical: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            critical: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            passed: false,
            critical,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartupCheckReport {
    pub checks: Vec<CheckResult>,
    pub all_critical_passed: bool,
    pub all_passed: bool,
    pub summary: String,
}

impl StartupCheckReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        let all_critical_passed = checks.iter().filter(|c| c.critical).all(|c| c.passed);
        let all_passed = checks.iter().all(|c| c.passed);

        let failed_critical = checks
            .iter()
            .filter(|c| c.critical && !c.passed)
            .count();
        let failed_non_critical = checks
            .iter()
            .filter(|c| !c.critical && !c.passed)
            .count();
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed).count();

        let summary = if all_passed {
            format!("All {} startup checks passed", total)
        } else if all_critical_passed {
            format!(
                "{}/{} checks passed ({} non-critical warnings)",
                passed, total, failed_non_critical
            )
        } else {
            format!(
                "{}/{} checks passed ({} critical failures)",
                passed, total, failed_critical
            )
        };

        Self {
            checks,
            all_critical_passed,
            all_passed,
            summary,
        }
    }

    /// Names of the failed critical checks
    pub fn critical_failures(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| c.critical && !c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }
}

pub async fn run_startup_checks(config: &Config, db: &DbPool) -> StartupCheckReport {
    info!("Running startup self-checks...");

    let checks = vec![
        check_token_config(config),
        check_database_connectivity(db).await,
        check_database_schema(db).await,
        check_beat_entries(config),
    ];

    let report = StartupCheckReport::new(checks);

    for check in &report.checks {
        if check.passed {
            info!(check = %check.name, message = %check.message, "Startup check PASSED");
        } else if check.critical {
            error!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (CRITICAL)"
            );
        } else {
            warn!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (non-critical)"
            );
        }
    }

    info!(
        summary = %report.summary,
        all_passed = report.all_passed,
        all_critical_passed = report.all_critical_passed,
        "Startup checks completed"
    );

    report
}

fn check_token_config(config: &Config) -> CheckResult {
    match TokenConfig::from_auth_config(&config.auth) {
        Ok(tokens) => CheckResult::pass(
            "token_config",
            format!(
                "Tokens signed with {:?}, valid for {} minutes",
                tokens.algorithm(),
                tokens.ttl().num_minutes()
            ),
        ),
        Err(e) => CheckResult::fail("token_config", "Token signing is not configured", true)
            .with_details(e.to_string()),
    }
}

async fn check_database_connectivity(db: &DbPool) -> CheckResult {
    match sqlx::query("SELECT 1").fetch_one(db).await {
        Ok(_) => CheckResult::pass("database_connectivity", "Database connection successful"),
        Err(e) => CheckResult::fail(
            "database_connectivity",
            "Failed to connect to database",
            true,
        )
        .with_details(e.to_string()),
    }
}

async fn check_database_schema(db: &DbPool) -> CheckResult {
    let result: Result<Vec<String>, _> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(db)
    .await;

    match result {
        Ok(tables) => {
            let missing: Vec<&str> = ESSENTIAL_TABLES
                .iter()
                .filter(|t| !tables.iter().any(|name| name == *t))
                .copied()
                .collect();

            if missing.is_empty() {
                CheckResult::pass(
                    "database_schema",
                    format!("Database schema valid ({} tables)", tables.len()),
                )
            } else {
                CheckResult::fail("database_schema", "Database schema incomplete", true)
                    .with_details(format!("Missing tables: {}", missing.join(", ")))
            }
        }
        Err(e) => CheckResult::fail("database_schema", "Failed to read database schema", true)
            .with_details(e.to_string()),
    }
}

fn check_beat_entries(config: &Config) -> CheckResult {
    let invalid: Vec<&str> = config
        .tasks
        .beat
        .iter()
        .filter(|entry| TaskKind::from_str(&entry.task).is_err() || entry.interval_seconds == 0)
        .map(|entry| entry.task.as_str())
        .collect();

    if invalid.is_empty() {
        CheckResult::pass(
            "periodic_tasks",
            format!("{} periodic tasks configured", config.tasks.beat.len()),
        )
    } else {
        CheckResult::fail("periodic_tasks", "Some periodic tasks will be skipped", false)
            .with_details(format!("Invalid entries: {}", invalid.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BeatEntry;
    use crate::db::init_memory;

    fn config_with_secret() -> Config {
        let mut config = Config::default();
        config.auth.secret_key = Some("startup-check-secret".to_string());
        config
    }

    #[test]
    fn test_report_summary() {
        let report = StartupCheckReport::new(vec![
            CheckResult::pass("a", "ok"),
            CheckResult::fail("b", "not ok", false),
        ]);
        assert!(report.all_critical_passed);
        assert!(!report.all_passed);
        assert!(report.critical_failures().is_empty());

        let report = StartupCheckReport::new(vec![CheckResult::fail("c", "broken", true)]);
        assert!(!report.all_critical_passed);
        assert_eq!(report.critical_failures(), vec!["c"]);
    }

    #[test]
    fn test_missing_secret_is_critical() {
        let check = check_token_config(&Config::default());
        assert!(!check.passed);
        assert!(check.critical);

        assert!(check_token_config(&config_with_secret()).passed);
    }

    #[test]
    fn test_invalid_beat_entries_are_warnings() {
        let mut config = config_with_secret();
        config.tasks.beat = vec![
            BeatEntry {
                task: "background".to_string(),
                message: None,
                interval_seconds: 60,
            },
            BeatEntry {
                task: "reindex".to_string(),
                message: None,
                interval_seconds: 60,
            },
        ];

        let check = check_beat_entries(&config);
        assert!(!check.passed);
        assert!(!check.critical);
        assert_eq!(check.details.as_deref(), Some("Invalid entries: reindex"));
    }

    #[tokio::test]
    async fn test_checks_pass_on_fresh_database() {
        let db = init_memory().await.unwrap();
        let report = run_startup_checks(&config_with_secret(), &db).await;
        assert!(report.all_passed, "{}", report.summary);
    }
}
