//! Client side of the session channel.
//!
//! Provides the connect-or-spawn pattern: every invocation pings the service,
//! starts it detached when nothing answers, then sends exactly one request over
//! a fresh connection.

use super::protocol::{ErrorCode, Request, Response};
use super::transport::{self, read_message, write_message, TransportError};
use crate::config::ClientConfig;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest response the client is willing to buffer.
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot reach session service: {0}")]
    Connection(String),
    #[error("Session service did not respond within {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("Session service closed the connection without responding")]
    Closed,
    #[error("Invalid response from session service: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Client-side failures are reported to callers as `CONNECTION_ERROR`.
    pub fn into_response(self) -> Response {
        Response::failure(ErrorCode::ConnectionError, self.to_string())
    }
}

/// Starts a session service listening on `address`.
pub trait ServiceSpawner: Send + Sync {
    fn spawn(&self, address: &Path) -> std::io::Result<()>;
}

/// Re-executes the current binary as `serve`, detached from the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedProcessSpawner;

impl ServiceSpawner for DetachedProcessSpawner {
    fn spawn(&self, address: &Path) -> std::io::Result<()> {
        let exe = std::env::current_exe()?;
        let mut command = std::process::Command::new(exe);
        command
            .arg("serve")
            .arg("--socket")
            .arg(address)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        let child = command.spawn()?;
        tracing::debug!(pid = child.id(), "spawned session service");
        Ok(())
    }
}

pub struct SessionClient {
    address: PathBuf,
    config: ClientConfig,
    spawner: Box<dyn ServiceSpawner>,
}

impl SessionClient {
    pub fn new(address: PathBuf, config: ClientConfig) -> Self {
        Self {
            address,
            config,
            spawner: Box::new(DetachedProcessSpawner),
        }
    }

    #[cfg(test)]
    pub fn with_spawner(mut self, spawner: impl ServiceSpawner + 'static) -> Self {
        self.spawner = Box::new(spawner);
        self
    }

    /// One request/response exchange, bounded by `timeout`. Dropping the
    /// connection on timeout is the only cleanup.
    pub async fn send(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        tokio::time::timeout(timeout, self.exchange(request))
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    async fn exchange(&self, request: &Request) -> Result<Response, ClientError> {
        let mut conn = transport::connect(&self.address)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let payload =
            serde_json::to_vec(request).map_err(|e| ClientError::Protocol(e.to_string()))?;
        write_message(&mut conn, &payload)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let reply = match read_message(&mut conn, MAX_RESPONSE_BYTES).await {
            Ok(reply) => reply,
            Err(TransportError::Closed) => return Err(ClientError::Closed),
            Err(TransportError::RequestTooLarge { limit }) => {
                return Err(ClientError::Protocol(format!(
                    "response exceeds {} bytes",
                    limit
                )))
            }
            Err(TransportError::Io(e)) => return Err(ClientError::Connection(e.to_string())),
        };
        serde_json::from_slice(&reply).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// True when a service answers `ping` within the ping timeout.
    pub async fn ping(&self) -> bool {
        matches!(
            self.send(&Request::new("ping"), self.config.ping_timeout).await,
            Ok(response) if response.success
        )
    }

    /// Makes sure a service is listening, starting one if allowed.
    pub async fn ensure_running(&self) -> Result<(), ClientError> {
        if self.ping().await {
            return Ok(());
        }
        if !self.config.auto_spawn {
            return Err(ClientError::Connection(format!(
                "no session service is listening on {}",
                self.address.display()
            )));
        }

        tracing::info!(address = %self.address.display(), "starting session service");
        self.spawner.spawn(&self.address).map_err(|e| {
            ClientError::Connection(format!("failed to start session service: {}", e))
        })?;

        for attempt in 1..=self.config.spawn_poll_attempts {
            tokio::time::sleep(self.config.spawn_poll_interval).await;
            if self.ping().await {
                tracing::debug!(attempt, "session service is up");
                return Ok(());
            }
        }
        Err(ClientError::Connection(format!(
            "session service did not start after {} attempts",
            self.config.spawn_poll_attempts
        )))
    }

    /// Sends `request`, starting the service first when needed. Never fails:
    /// client-side problems come back as a `CONNECTION_ERROR` response.
    ///
    /// `shutdown` is routed to [`shutdown`](Self::shutdown) in any letter case.
    pub async fn call(&self, request: &Request) -> Response {
        if request.command.eq_ignore_ascii_case("shutdown") {
            return self.shutdown().await;
        }
        let result = async {
            self.ensure_running().await?;
            self.send(request, self.config.call_timeout).await
        }
        .await;
        result.unwrap_or_else(ClientError::into_response)
    }

    /// Asks a running service to stop. Never starts one.
    ///
    /// The service may close the channel before the response is read; that
    /// still counts as a successful shutdown.
    pub async fn shutdown(&self) -> Response {
        match self
            .send(&Request::new("shutdown"), self.config.call_timeout)
            .await
        {
            Ok(response) => response,
            Err(ClientError::Closed) => Response::success(json!({ "shutdown": true })),
            Err(e) => e.into_response(),
        }
    }
}

#[cfg(all(test, unix))]
#[path = "tests/client_tests.rs"]
mod tests;
