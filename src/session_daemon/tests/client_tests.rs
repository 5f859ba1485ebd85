//! Client launcher tests against in-process services and scripted fakes.

use super::*;
use crate::automation::FixtureProvider;
use crate::session_daemon::idle::ActivityClock;
use crate::session_daemon::server::{Limits, SessionService};
use crate::session_daemon::session::SessionContext;
use crate::session_daemon::transport::ChannelListener;
use crate::test_support::sample_provider;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn fast_config() -> ClientConfig {
    ClientConfig {
        ping_timeout: Duration::from_millis(200),
        spawn_poll_interval: Duration::from_millis(20),
        spawn_poll_attempts: 50,
        call_timeout: Duration::from_secs(5),
        auto_spawn: true,
    }
}

fn socket_in(dir: &TempDir) -> PathBuf {
    dir.path().join("svc.sock")
}

/// Starts the real service inside the test runtime instead of a new process.
#[derive(Clone)]
struct InProcessSpawner {
    provider: FixtureProvider,
    spawned: Arc<AtomicUsize>,
}

impl InProcessSpawner {
    fn new() -> Self {
        Self {
            provider: sample_provider(),
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl ServiceSpawner for InProcessSpawner {
    fn spawn(&self, address: &Path) -> std::io::Result<()> {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        let address = address.to_path_buf();
        let provider = self.provider.clone();
        tokio::spawn(async move {
            let listener = ChannelListener::bind(&address).await.unwrap();
            let session = SessionContext::new(Box::new(provider), std::env::temp_dir());
            SessionService::new(
                session,
                Limits::default(),
                ActivityClock::new(),
                CancellationToken::new(),
            )
            .run(listener)
            .await;
        });
        Ok(())
    }
}

struct FailingSpawner;

impl ServiceSpawner for FailingSpawner {
    fn spawn(&self, _address: &Path) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no binary"))
    }
}

/// Claims success but never starts anything.
struct SilentSpawner;

impl ServiceSpawner for SilentSpawner {
    fn spawn(&self, _address: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

enum Fake {
    /// Reads the request and never answers.
    Stall,
    /// Reads the request and hangs up.
    HangUp,
    /// Answers every request with these bytes.
    Reply(&'static [u8]),
}

fn fake_service(address: &Path, behavior: Fake) -> tokio::task::JoinHandle<()> {
    let listener = tokio::net::UnixListener::bind(address).unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let _ = read_message(&mut stream, 1 << 20).await;
            match behavior {
                Fake::Stall => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Fake::HangUp => drop(stream),
                Fake::Reply(bytes) => {
                    let _ = write_message(&mut stream, bytes).await;
                }
            }
        }
    })
}

#[tokio::test]
async fn test_call_auto_starts_service_once() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = InProcessSpawner::new();
    let client = SessionClient::new(socket_in(&dir), fast_config()).with_spawner(spawner.clone());

    let response = client.call(&Request::new("ping")).await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.data, Some(json!("pong")));
    assert_eq!(spawner.count(), 1);

    let response = client.call(&Request::new("process.list")).await;
    assert!(response.success);
    assert_eq!(spawner.count(), 1, "running service is reused");
}

#[tokio::test]
async fn test_service_state_persists_between_calls() {
    let dir = tempfile::tempdir().unwrap();
    let client =
        SessionClient::new(socket_in(&dir), fast_config()).with_spawner(InProcessSpawner::new());

    let connected = client
        .call(&Request::new("connect").with_arg("name", "notepad"))
        .await;
    assert!(connected.success);

    let status = client.call(&Request::new("status")).await;
    assert_eq!(status.data.unwrap()["processName"], "notepad");
}

#[tokio::test]
async fn test_no_spawn_reports_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        auto_spawn: false,
        ..fast_config()
    };
    let spawner = InProcessSpawner::new();
    let client = SessionClient::new(socket_in(&dir), config).with_spawner(spawner.clone());

    let response = client.call(&Request::new("ping")).await;
    assert_eq!(response.error_code(), Some(ErrorCode::ConnectionError));
    assert!(response.data.is_none());
    assert_eq!(spawner.count(), 0);
}

#[tokio::test]
async fn test_spawn_failure_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = SessionClient::new(socket_in(&dir), fast_config()).with_spawner(FailingSpawner);
    let response = client.call(&Request::new("ping")).await;
    assert_eq!(response.error_code(), Some(ErrorCode::ConnectionError));
    assert!(response.error.unwrap().message.contains("failed to start"));
}

#[tokio::test]
async fn test_gives_up_when_service_never_appears() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        spawn_poll_attempts: 3,
        ..fast_config()
    };
    let client = SessionClient::new(socket_in(&dir), config).with_spawner(SilentSpawner);
    let response = client.call(&Request::new("status")).await;
    assert_eq!(response.error_code(), Some(ErrorCode::ConnectionError));
    assert!(response
        .error
        .unwrap()
        .message
        .contains("did not start after 3 attempts"));
}

#[tokio::test]
async fn test_send_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let address = socket_in(&dir);
    let _fake = fake_service(&address, Fake::Stall);

    let client = SessionClient::new(address, fast_config());
    let err = client
        .send(&Request::new("ping"), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(!client.ping().await);

    let response = err.into_response();
    assert_eq!(response.error_code(), Some(ErrorCode::ConnectionError));
    assert!(response.error.unwrap().message.contains("100ms"));
}

#[tokio::test]
async fn test_garbage_reply_is_protocol_error() {
    let dir = tempfile::tempdir().unwrap();
    let address = socket_in(&dir);
    let _fake = fake_service(&address, Fake::Reply(b"definitely not json"));

    let client = SessionClient::new(address, fast_config());
    let err = client
        .send(&Request::new("ping"), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn test_shutdown_tolerates_early_close() {
    let dir = tempfile::tempdir().unwrap();
    let address = socket_in(&dir);
    let _fake = fake_service(&address, Fake::HangUp);

    let client = SessionClient::new(address, fast_config());
    let response = client.shutdown().await;
    assert!(response.success);
    assert_eq!(response.data, Some(json!({"shutdown": true})));
}

#[tokio::test]
async fn test_shutdown_never_spawns() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = InProcessSpawner::new();
    let client = SessionClient::new(socket_in(&dir), fast_config()).with_spawner(spawner.clone());

    let response = client.shutdown().await;
    assert_eq!(response.error_code(), Some(ErrorCode::ConnectionError));
    assert_eq!(spawner.count(), 0);
}

#[tokio::test]
async fn test_shutdown_stops_running_service() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = InProcessSpawner::new();
    let client = SessionClient::new(socket_in(&dir), fast_config()).with_spawner(spawner.clone());

    assert!(client.call(&Request::new("ping")).await.success);
    let response = client.shutdown().await;
    assert_eq!(response.data, Some(json!({"shutdown": true})));

    // Give the service a moment to tear down its socket.
    let mut stopped = false;
    for _ in 0..50 {
        if !client.ping().await {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(stopped, "service still answering after shutdown");
    assert!(spawner.provider.is_released().await);
}

#[tokio::test]
async fn test_call_shutdown_tolerates_early_close() {
    let dir = tempfile::tempdir().unwrap();
    let address = socket_in(&dir);
    let _fake = fake_service(&address, Fake::HangUp);

    let spawner = InProcessSpawner::new();
    let client = SessionClient::new(address, fast_config()).with_spawner(spawner.clone());
    let response = client.call(&Request::new("SHUTDOWN")).await;
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.data, Some(json!({"shutdown": true})));
    assert_eq!(spawner.count(), 0);
}

#[tokio::test]
async fn test_call_shutdown_does_not_start_a_service() {
    let dir = tempfile::tempdir().unwrap();
    let spawner = InProcessSpawner::new();
    let client = SessionClient::new(socket_in(&dir), fast_config()).with_spawner(spawner.clone());

    let response = client.call(&Request::new("shutdown")).await;
    assert_eq!(response.error_code(), Some(ErrorCode::ConnectionError));
    assert_eq!(spawner.count(), 0);
}
