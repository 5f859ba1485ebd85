//! Session service: accept loop, request processing and shutdown.
//!
//! Connections are handled strictly one at a time. Each carries one request and
//! one response; the session state is owned by the loop and never shared.

use super::idle::{spawn_idle_monitor, ActivityClock};
use super::protocol::{ErrorCode, Request, Response};
use super::router::CommandRouter;
use super::session::SessionContext;
use super::transport::{
    read_message, write_message, BoxedConnection, ChannelListener, TransportError,
};
use crate::automation::{AutomationProvider, FixtureProvider, UnavailableProvider};
use crate::config::ServiceConfig;
use crate::paths;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Message size limits enforced by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_request_bytes: usize,
    pub max_response_bytes: usize,
}

impl From<&ServiceConfig> for Limits {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            max_request_bytes: config.max_request_bytes,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

/// Used if even the replacement error response cannot be encoded.
const ENCODE_FAILURE: &[u8] = concat!(
    r#"{"success":false,"data":null,"#,
    r#""error":{"code":"INTERNAL_ERROR","message":"Failed to encode response"},"#,
    r#""timestamp":"1970-01-01T00:00:00.000Z"}"#
)
.as_bytes();

pub struct SessionService {
    router: CommandRouter,
    session: SessionContext,
    clock: ActivityClock,
    cancel: CancellationToken,
    limits: Limits,
}

impl SessionService {
    pub fn new(
        session: SessionContext,
        limits: Limits,
        clock: ActivityClock,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            router: CommandRouter::new(),
            session,
            clock,
            cancel,
            limits,
        }
    }

    /// Serves until shutdown, idle timeout or external cancellation, then
    /// releases the provider and removes the channel.
    pub async fn run(mut self, mut listener: ChannelListener) {
        let cancel = self.cancel.clone();
        tracing::info!(address = %listener.address().display(), "session service listening");

        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            let conn = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let request = self.clock.begin_request();
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("cancelled while handling a request");
                    break;
                }
                _ = self.handle_connection(conn) => {}
            }
            drop(request);

            if self.session.shutdown_requested() {
                cancel.cancel();
                break;
            }
        }

        self.session.close().await;
        drop(listener);
        tracing::info!("session service stopped");
    }

    async fn handle_connection(&mut self, mut conn: BoxedConnection) {
        let response = match read_message(&mut conn, self.limits.max_request_bytes).await {
            Ok(message) => self.process_message(&message).await,
            Err(TransportError::RequestTooLarge { limit }) => {
                tracing::warn!(limit, "request too large");
                Response::failure(
                    ErrorCode::InvalidRequest,
                    format!("Request exceeds the {} byte limit", limit),
                )
            }
            Err(TransportError::Closed) => {
                tracing::debug!("client closed without sending a request");
                return;
            }
            Err(TransportError::Io(e)) => {
                tracing::warn!(error = %e, "failed to read request");
                return;
            }
        };

        let payload = self.encode(&response);
        if let Err(e) = write_message(&mut conn, &payload).await {
            tracing::warn!(error = %e, "failed to write response");
        }
        let _ = conn.shutdown().await;
    }

    async fn process_message(&mut self, message: &[u8]) -> Response {
        let request: Request = match serde_json::from_slice(message) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable request");
                return Response::failure(
                    ErrorCode::InvalidRequest,
                    format!("Invalid request: {}", e),
                );
            }
        };

        tracing::debug!(command = %request.command, "request received");
        let dispatch = self.router.dispatch(&mut self.session, &request).await;
        if dispatch.activity {
            self.clock.touch();
        }
        dispatch.response
    }

    /// Serializes `response`, replacing it with an error when it exceeds the
    /// response limit.
    fn encode(&self, response: &Response) -> Vec<u8> {
        let limit = self.limits.max_response_bytes;
        let replacement = match serde_json::to_vec(response) {
            Ok(bytes) if bytes.len() <= limit => return bytes,
            Ok(bytes) => {
                tracing::warn!(size = bytes.len(), limit, "response too large");
                Response::failure(
                    ErrorCode::InternalError,
                    format!("Response of {} bytes exceeds the {} byte limit", bytes.len(), limit),
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                Response::failure(
                    ErrorCode::InternalError,
                    format!("Failed to encode response: {}", e),
                )
            }
        };
        serde_json::to_vec(&replacement).unwrap_or_else(|_| ENCODE_FAILURE.to_vec())
    }
}

fn provider_for(config: &ServiceConfig) -> Result<Box<dyn AutomationProvider>> {
    match &config.fixture {
        Some(path) => {
            tracing::info!(fixture = %path.display(), "serving fixture desktop");
            Ok(Box::new(FixtureProvider::from_file(path)?))
        }
        None => {
            tracing::warn!(
                os = std::env::consts::OS,
                "no UI automation backend available; every command will fail"
            );
            Ok(Box::new(UnavailableProvider))
        }
    }
}

/// Runs the session service on `address` until it terminates.
pub async fn run_service(config: ServiceConfig, address: &Path) -> Result<()> {
    let provider = provider_for(&config)?;
    let listener = ChannelListener::bind(address).await?;

    let pid_path = paths::service_pid_path()?;
    std::fs::write(&pid_path, std::process::id().to_string())
        .context("Failed to write PID file")?;

    tracing::info!(
        pid = std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
        git_sha = env!("UIAUTO_GIT_SHA"),
        idle_timeout_secs = config.idle_timeout_secs,
        "session service starting"
    );

    let cancel = CancellationToken::new();
    let clock = ActivityClock::new();
    clock.touch();

    // A zero timeout disables idle shutdown.
    let monitor = (!config.idle_timeout().is_zero()).then(|| {
        spawn_idle_monitor(
            clock.clone(),
            config.idle_timeout(),
            config.idle_check_interval(),
            cancel.clone(),
        )
    });
    let signals = spawn_signal_watcher(cancel.clone());

    let session = SessionContext::new(provider, config.screenshot_dir());
    SessionService::new(session, Limits::from(&config), clock, cancel.clone())
        .run(listener)
        .await;

    cancel.cancel();
    if let Some(monitor) = monitor {
        let _ = monitor.await;
    }
    signals.abort();
    let _ = std::fs::remove_file(&pid_path);
    Ok(())
}

fn spawn_signal_watcher(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = termination_signal() => {
                tracing::info!("termination signal received");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn termination_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(all(test, unix))]
#[path = "tests/server_tests.rs"]
mod tests;
