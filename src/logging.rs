//! Tracing setup for both entry modes.
//!
//! The service logs to `~/.uiauto/logs/service.log` (its stdio is detached).
//! Clients stay quiet unless `UIAUTO_LOG` is set, in which case they log to
//! stderr so stdout keeps carrying only the response JSON.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::EnvFilter;

/// Filter directives, in `EnvFilter` syntax.
pub const LOG_ENV: &str = "UIAUTO_LOG";

const SERVICE_DEFAULT_FILTER: &str = "info";
const CLIENT_DEFAULT_FILTER: &str = "warn";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the service subscriber, appending to `log_path`.
pub fn init_service_logging(log_path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter(SERVICE_DEFAULT_FILTER))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoUtc::rfc_3339())
        .try_init()
    {
        eprintln!("[uiauto] Warning: tracing already initialised: {}", e);
    }
    Ok(())
}

/// Installs a stderr subscriber for `serve --log-stderr`.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(SERVICE_DEFAULT_FILTER))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(ChronoUtc::rfc_3339())
        .try_init();
}

/// Installs a stderr subscriber for client commands when `UIAUTO_LOG` is set.
pub fn init_client_logging() {
    if std::env::var_os(LOG_ENV).is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(CLIENT_DEFAULT_FILTER))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
