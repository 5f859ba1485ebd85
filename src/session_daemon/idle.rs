//! Idle shutdown.
//!
//! The processing path stamps an [`ActivityClock`]; a background task wakes
//! periodically and cancels the service token once the last stamp is older
//! than the idle timeout. A request in progress holds the clock busy, so a
//! long handler is never cut off by the monitor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Monotonic "last activity" stamp shared between the service and the monitor.
#[derive(Debug, Clone)]
pub struct ActivityClock {
    origin: Instant,
    last_ms: Arc<AtomicU64>,
    busy: Arc<AtomicBool>,
}

/// Marks a request as in progress until dropped.
#[derive(Debug)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: Arc::new(AtomicU64::new(0)),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stamps activity and holds the clock busy until the guard is dropped.
    pub fn begin_request(&self) -> InFlight {
        self.touch();
        self.busy.store(true, Ordering::Release);
        InFlight {
            busy: Arc::clone(&self.busy),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn touch(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_ms.fetch_max(now, Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_ms.load(Ordering::Relaxed));
        self.origin.elapsed().saturating_sub(last)
    }
}

/// Spawns the monitor. It exits on its own once `cancel` fires.
pub fn spawn_idle_monitor(
    clock: ActivityClock,
    timeout: Duration,
    check_interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if clock.is_busy() {
                        continue;
                    }
                    let idle = clock.idle_for();
                    if idle > timeout {
                        tracing::info!(
                            idle_secs = idle.as_secs(),
                            timeout_secs = timeout.as_secs(),
                            "idle timeout reached, shutting down"
                        );
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
    })
}
