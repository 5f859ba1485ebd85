//! Home-based storage paths for the session service.
//!
//! Everything lives under `~/.uiauto/`:
//! - `uiauto-session.sock` - Local channel (unix only)
//! - `service.pid` - PID of the running session service
//! - `config.yaml` - Optional service configuration
//! - `logs/service.log` - Service log

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// The name of the uiauto home directory.
const UIAUTO_DIR: &str = ".uiauto";

/// Well-known name of the local channel shared by the service and its clients.
pub const CHANNEL_NAME: &str = "uiauto-session";

/// Overrides the channel location (socket path on unix, pipe name on Windows).
pub const SOCKET_ENV: &str = "UIAUTO_SOCKET";

/// Returns the home-based uiauto directory: `~/.uiauto/`
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if:
/// - Home directory cannot be determined
/// - Directory creation fails
pub fn uiauto_home_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(UIAUTO_DIR);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create uiauto directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the logs directory: `~/.uiauto/logs/`
///
/// Creates the directory if it doesn't exist.
pub fn logs_dir() -> Result<PathBuf> {
    let dir = uiauto_home_dir()?.join("logs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the service log path: `~/.uiauto/logs/service.log`
pub fn service_log_path() -> Result<PathBuf> {
    Ok(logs_dir()?.join("service.log"))
}

/// Returns the service PID file path: `~/.uiauto/service.pid`
pub fn service_pid_path() -> Result<PathBuf> {
    Ok(uiauto_home_dir()?.join("service.pid"))
}

/// Returns the optional config file path: `~/.uiauto/config.yaml`
pub fn config_path() -> Result<PathBuf> {
    Ok(uiauto_home_dir()?.join("config.yaml"))
}

/// Returns the address of the local channel.
///
/// On unix this is a socket file, `~/.uiauto/uiauto-session.sock` unless
/// `UIAUTO_SOCKET` points elsewhere.
#[cfg(unix)]
pub fn channel_address() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(SOCKET_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(uiauto_home_dir()?.join(format!("{}.sock", CHANNEL_NAME)))
}

/// Returns the address of the local channel.
///
/// On Windows this is the named pipe `\\.\pipe\uiauto-session` unless
/// `UIAUTO_SOCKET` names another pipe.
#[cfg(windows)]
pub fn channel_address() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(SOCKET_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(PathBuf::from(format!(r"\\.\pipe\{}", CHANNEL_NAME)))
}
