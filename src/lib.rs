pub mod analysis;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod db;
pub mod demo;
pub mod errors;
pub mod models;
pub mod redaction;
pub mod session;
pub mod storage;

#[cfg(feature = "desktop")]
mod desktop;
#[cfg(test)]
mod test_support;

pub use crate::dashboard::{CoreOptions, DashboardCore};
pub use crate::errors::{AppError, AppResult};
#[cfg(feature = "desktop")]
pub use crate::desktop::run;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// JSON logs rolled daily under `<app_data_dir>/logs`. `RUST_LOG` overrides
/// the default `info` filter.
pub fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "adinsight.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
