use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront::api::metrics::init_metrics;
use shopfront::auth::{TokenConfig, TokenService};
use shopfront::config::Config;
use shopfront::startup::run_startup_checks;
use shopfront::tasks::{spawn_beat, TaskDispatcher};
use shopfront::AppState;

#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(author, version, about = "E-commerce catalog, review and account API", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "shopfront.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Token signing secret; overrides `auth.secret_key`
    #[arg(long, env = "SHOPFRONT_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(secret) = cli.secret_key {
        config.auth.secret_key = Some(secret);
    }

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shopfront v{}", env!("CARGO_PKG_VERSION"));

    let token_config =
        TokenConfig::from_auth_config(&config.auth).context("Invalid [auth] configuration")?;

    let db = shopfront::db::init(&config.server.database_url, config.server.max_connections).await?;

    let report = run_startup_checks(&config, &db).await;
    if !report.all_critical_passed {
        bail!(
            "Startup checks failed: {}",
            report.critical_failures().join(", ")
        );
    }

    let (dispatcher, worker) = TaskDispatcher::channel(config.tasks.queue_capacity);
    tokio::spawn(worker.run());
    spawn_beat(dispatcher.clone(), &config.tasks.beat);

    let metrics_handle = init_metrics().context("Failed to install Prometheus recorder")?;

    let state = Arc::new(
        AppState::new(config.clone(), db, TokenService::new(token_config), dispatcher)
            .with_metrics(metrics_handle),
    );

    let app = shopfront::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
