use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides `idle_timeout_secs` from the environment.
pub const IDLE_SECS_ENV: &str = "UIAUTO_IDLE_SECS";

/// Session service configuration.
///
/// Read from `~/.uiauto/config.yaml` when present; every field has a default so
/// an empty or missing file yields the stock service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Inactivity period after which the service terminates itself. Default: 300
    pub idle_timeout_secs: u64,
    /// How often the idle monitor wakes up. Default: 30
    pub idle_check_interval_secs: u64,
    /// Largest accepted request message in bytes. Default: 64 KiB
    pub max_request_bytes: usize,
    /// Largest response message in bytes. Default: 1 MiB
    pub max_response_bytes: usize,
    /// Where `screenshot` writes files when no `output` is given.
    /// Default: the system temp directory
    pub screenshot_dir: Option<PathBuf>,
    /// Fixture desktop served instead of a platform automation backend.
    pub fixture: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            idle_check_interval_secs: 30,
            max_request_bytes: 64 * 1024,
            max_response_bytes: 1024 * 1024,
            screenshot_dir: None,
            fixture: None,
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    5 * 60
}

impl ServiceConfig {
    /// Loads the config file (if any) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = crate::paths::config_path()?;
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `UIAUTO_IDLE_SECS`; unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(secs) = std::env::var(IDLE_SECS_ENV)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            self.idle_timeout_secs = secs;
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_secs(self.idle_check_interval_secs.max(1))
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.screenshot_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Timing knobs for the client launcher.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for the liveness `ping`.
    pub ping_timeout: Duration,
    /// Delay between `ping` attempts after spawning the service.
    pub spawn_poll_interval: Duration,
    /// Number of `ping` attempts after spawning before giving up.
    pub spawn_poll_attempts: u32,
    /// Timeout for the actual command.
    pub call_timeout: Duration,
    /// Whether an unreachable service is started automatically.
    pub auto_spawn: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ping_timeout: Duration::from_secs(1),
            spawn_poll_interval: Duration::from_millis(200),
            spawn_poll_attempts: 10,
            call_timeout: Duration::from_secs(30),
            auto_spawn: true,
        }
    }
}
