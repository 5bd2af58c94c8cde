pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod startup;
pub mod tasks;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::auth::TokenService;
use crate::tasks::TaskDispatcher;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
    pub tasks: TaskDispatcher,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, tokens: TokenService, tasks: TaskDispatcher) -> Self {
        Self {
            config,
            db,
            tokens,
            tasks,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
