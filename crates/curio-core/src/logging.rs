//! Tracing setup.
//!
//! Logs go to a daily-rotated file under `$CURIO_HOME/logs`; stdout and
//! stderr stay reserved for the user-facing surface.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Env var holding the filter directives (same syntax as `RUST_LOG`).
pub const LOG_ENV: &str = "CURIO_LOG";

const DEFAULT_LEVEL: &str = "info";

/// Builds the filter: `CURIO_LOG` if set, otherwise `info` with the HTTP
/// stack turned down.
pub fn build_env_filter(directives: Option<&str>) -> Result<EnvFilter> {
    let filter_str = match directives {
        Some(d) if !d.trim().is_empty() => d.trim().to_string(),
        _ => [DEFAULT_LEVEL, "hyper=warn", "reqwest=warn", "h2=warn"].join(","),
    };
    EnvFilter::try_new(&filter_str)
        .with_context(|| format!("Invalid tracing filter '{filter_str}'"))
}

/// Installs the global subscriber writing to `dir/curio.log.<date>`.
///
/// The returned guard flushes buffered lines on drop; keep it alive for the
/// whole process.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, "curio.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let directives = std::env::var(LOG_ENV).ok();
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(build_env_filter(directives.as_deref())?)
        .with(layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(dir = %dir.display(), "logging initialized");
    Ok(guard)
}
