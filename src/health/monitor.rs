use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::status::HealthStatus;
use crate::api::Transport;
use crate::app::HealthConfig;
use crate::constants::HEALTH_ENDPOINT;

/// State shared between the monitor handle and its polling task
struct Prober {
    transport: Arc<dyn Transport>,
    endpoint: String,
    timeout: Duration,
    status: watch::Sender<HealthStatus>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the probe ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Prober {
    /// Run one probe unless another is still in flight
    ///
    /// Returns the published status, or `None` when the probe was skipped or the
    /// monitor was stopped before it resolved.
    async fn probe_once(&self, cancel: &CancellationToken) -> Option<HealthStatus> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Health probe still in flight, skipping tick");
            return None;
        }
        let _guard = InFlight(&self.in_flight);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return None,
            outcome = tokio::time::timeout(self.timeout, self.transport.probe(&self.endpoint)) => outcome,
        };

        let status = match outcome {
            Ok(result) => {
                if let Err(e) = &result {
                    debug!("Health probe failed: {}", e);
                }
                HealthStatus::from_probe(&result)
            }
            Err(_) => {
                debug!("Health probe timed out after {:?}", self.timeout);
                HealthStatus::Offline
            }
        };

        self.publish(status, cancel).then_some(status)
    }

    /// Overwrite the current status; refused once the monitor has been stopped
    fn publish(&self, status: HealthStatus, cancel: &CancellationToken) -> bool {
        let mut accepted = false;
        // The cancellation check runs under the channel's write lock, see `HealthMonitor::stop`
        self.status.send_if_modified(|current| {
            if cancel.is_cancelled() {
                return false;
            }
            accepted = true;
            if *current == status {
                return false;
            }
            match status {
                HealthStatus::Online => info!("Analysis service is online"),
                HealthStatus::Offline => warn!("Analysis service is offline"),
                HealthStatus::Loading => {}
            }
            *current = status;
            true
        });
        accepted
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    /// Task of the scheduled check currently running, if any
    current: Arc<Mutex<Option<JoinHandle<()>>>>,
}

/// Periodic liveness prober publishing a tri-state status
///
/// The first probe fires as soon as the monitor starts, then once per interval.
/// The monitor is the only writer of its status; readers `subscribe()`.
pub struct HealthMonitor {
    prober: Arc<Prober>,
    interval: Duration,
    running: Option<Running>,
}

impl HealthMonitor {
    /// Create a monitor using the configured interval and probe timeout
    pub fn new(transport: Arc<dyn Transport>, config: &HealthConfig) -> Self {
        Self::with_timing(transport, config.interval(), config.timeout())
    }

    /// Create a monitor with explicit timing
    pub fn with_timing(transport: Arc<dyn Transport>, interval: Duration, timeout: Duration) -> Self {
        let (status, _) = watch::channel(HealthStatus::Loading);

        Self {
            prober: Arc::new(Prober {
                transport,
                endpoint: HEALTH_ENDPOINT.to_string(),
                timeout,
                status,
                in_flight: AtomicBool::new(false),
            }),
            interval,
            running: None,
        }
    }

    /// Start polling. Calling this on a running monitor does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let current = Arc::new(Mutex::new(None::<JoinHandle<()>>));
        let prober = Arc::clone(&self.prober);
        let token = cancel.clone();
        let slot = Arc::clone(&current);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                // The schedule keeps ticking while a probe runs; a tick that finds
                // one in flight is dropped, never queued
                let mut running = slot.lock();
                if token.is_cancelled() {
                    break;
                }
                if running.as_ref().is_some_and(|task| !task.is_finished()) {
                    debug!("Health probe still in flight, skipping tick");
                    continue;
                }
                let prober = Arc::clone(&prober);
                let token = token.clone();
                *running = Some(tokio::spawn(async move {
                    prober.probe_once(&token).await;
                }));
            }
            debug!("Health monitor loop exited");
        });

        debug!("Health monitor started ({:?} interval)", interval);
        self.running = Some(Running {
            cancel,
            handle,
            current,
        });
    }

    /// Stop polling. Safe to call any number of times.
    ///
    /// Once this returns no probe fires and no outcome is published, including
    /// the outcome of a probe that was in flight.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();
        running.handle.abort();
        // The loop checks the token under this lock, so nothing spawns after the take
        if let Some(task) = running.current.lock().take() {
            task.abort();
        }
        // Barrier: wait out any publish already holding the write lock
        self.prober.status.send_if_modified(|_| false);
        debug!("Health monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Probe right away, outside the regular schedule
    ///
    /// Skipped (returns `None`) when the monitor is stopped or a probe is already in flight.
    pub async fn probe_now(&self) -> Option<HealthStatus> {
        let cancel = self.running.as_ref()?.cancel.clone();
        self.prober.probe_once(&cancel).await
    }

    /// Current status
    pub fn status(&self) -> HealthStatus {
        *self.prober.status.borrow()
    }

    /// Receive every status change
    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.prober.status.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockTransport};
    use crate::utils::NetworkError;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Transport whose probes take a fixed time and follow a script of outcomes
    struct ScriptedTransport {
        delay: Duration,
        script: Mutex<Vec<bool>>,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(delay: Duration, script: Vec<bool>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn call(&self, _: &str, _: Method, _: Option<Value>) -> Result<Value, NetworkError> {
            unreachable!("the monitor only probes")
        }

        async fn probe(&self, endpoint: &str) -> Result<(), NetworkError> {
            assert_eq!(endpoint, "/health");
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let up = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script.first().copied().unwrap_or(true)
                }
            };
            if up {
                Ok(())
            } else {
                Err(NetworkError::status(503, "/health returned 503"))
            }
        }
    }

    fn monitor(transport: Arc<ScriptedTransport>, interval_secs: u64, timeout_secs: u64) -> HealthMonitor {
        HealthMonitor::with_timing(
            transport,
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_probe_is_immediate() {
        let transport = ScriptedTransport::new(Duration::from_millis(10), vec![true]);
        let mut monitor = monitor(transport.clone(), 30, 5);
        assert_eq!(monitor.status(), HealthStatus::Loading);

        monitor.start();
        advance(1).await;

        assert_eq!(transport.calls(), 1);
        assert_eq!(monitor.status(), HealthStatus::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_never_reverts_to_loading() {
        let transport = ScriptedTransport::new(Duration::from_millis(10), vec![true, false, true]);
        let mut monitor = monitor(transport.clone(), 30, 5);
        let mut rx = monitor.subscribe();
        monitor.start();

        let mut seen = Vec::new();
        for _ in 0..3 {
            rx.changed().await.unwrap();
            seen.push(*rx.borrow_and_update());
        }

        assert_eq!(
            seen,
            vec![HealthStatus::Online, HealthStatus::Offline, HealthStatus::Online]
        );
        assert!(!seen.contains(&HealthStatus::Loading));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probes_never_overlap() {
        // Each probe outlives two ticks
        let transport = ScriptedTransport::new(Duration::from_secs(75), vec![true]);
        let mut monitor = monitor(transport.clone(), 30, 120);
        monitor.start();

        advance(200).await;

        assert_eq!(transport.max_active.load(Ordering::SeqCst), 1);
        // Probes at t=0, 90 and 180; the ticks at 30, 60, 120 and 150 were dropped
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_probe_skipped_while_in_flight() {
        let transport = ScriptedTransport::new(Duration::from_secs(10), vec![true]);
        let mut monitor = monitor(transport.clone(), 30, 20);
        monitor.start();
        advance(1).await;

        assert_eq!(monitor.probe_now().await, None);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_offline() {
        let transport = ScriptedTransport::new(Duration::from_secs(60), vec![true]);
        let mut monitor = monitor(transport.clone(), 30, 5);
        monitor.start();
        advance(6).await;

        assert_eq!(monitor.status(), HealthStatus::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_probe_after_stop() {
        let transport = ScriptedTransport::new(Duration::from_millis(10), vec![true]);
        let mut monitor = monitor(transport.clone(), 30, 5);
        monitor.start();
        advance(1).await;
        monitor.stop();

        advance(300).await;
        assert_eq!(transport.calls(), 1);
        assert!(!monitor.is_running());
        assert_eq!(monitor.probe_now().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_outcome_discarded_after_stop() {
        let transport = ScriptedTransport::new(Duration::from_secs(3), vec![true]);
        let mut monitor = monitor(transport.clone(), 30, 5);
        monitor.start();
        advance(1).await;
        assert_eq!(transport.calls(), 1);

        monitor.stop();
        advance(10).await;

        assert_eq!(monitor.status(), HealthStatus::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_aborts_running_check() {
        let transport = ScriptedTransport::new(Duration::from_secs(3), vec![true]);
        let mut monitor = monitor(transport.clone(), 30, 5);
        monitor.start();
        advance(1).await;
        assert_eq!(transport.active.load(Ordering::SeqCst), 1);

        monitor.stop();
        advance(10).await;

        // Neither the loop nor the check task holds the shared state any more
        assert_eq!(Arc::strong_count(&monitor.prober), 1);
        // The slow call was dropped mid-flight and never completed
        assert_eq!(transport.active.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_restart_keeps_status() {
        let transport = ScriptedTransport::new(Duration::from_millis(10), vec![false, true]);
        let mut monitor = monitor(transport.clone(), 30, 5);
        monitor.start();
        advance(1).await;
        assert_eq!(monitor.status(), HealthStatus::Offline);

        monitor.stop();
        monitor.stop();

        monitor.start();
        assert_eq!(monitor.status(), HealthStatus::Offline);
        advance(1).await;
        assert_eq!(monitor.status(), HealthStatus::Online);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_probe_uses_health_endpoint() {
        let mut transport = MockTransport::new();
        transport
            .expect_probe()
            .withf(|endpoint| endpoint == "/health")
            .returning(|_| Err(NetworkError::transport("connection refused")));

        let mut monitor =
            HealthMonitor::with_timing(Arc::new(transport), Duration::from_secs(30), Duration::from_secs(5));
        monitor.start();

        let mut rx = monitor.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), HealthStatus::Offline);
    }
}
