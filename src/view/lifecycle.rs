use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::health::{HealthMonitor, HealthStatus};

/// Handle for one in-flight request issued by a view
///
/// A ticket goes stale when its view deactivates; its result must then be dropped.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    current: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl Ticket {
    /// Whether the view that issued this ticket is still the same activation
    pub fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && self.current.load(Ordering::Acquire) == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drive `work` to completion unless the view deactivates first
    ///
    /// Returns `None` when the work was cancelled; the future is dropped in that case.
    pub async fn run<F: Future>(&self, work: F) -> Option<F::Output> {
        if !self.is_current() {
            return None;
        }

        tokio::select! {
            _ = self.cancel.cancelled() => None,
            output = work => Some(output),
        }
    }
}

/// Ties background work to the visible lifetime of one view
///
/// `activate` starts the health monitor (if the view owns one) and opens a new
/// generation; `deactivate` stops the monitor, cancels in-flight requests and
/// invalidates every ticket issued so far.
pub struct ViewLifecycle {
    generation: Arc<AtomicU64>,
    cancel: CancellationToken,
    monitor: Option<HealthMonitor>,
    active: bool,
}

impl ViewLifecycle {
    pub fn new() -> Self {
        let cancel = CancellationToken::new();
        // Inactive until the first activate()
        cancel.cancel();

        Self {
            generation: Arc::new(AtomicU64::new(0)),
            cancel,
            monitor: None,
            active: false,
        }
    }

    /// A lifecycle that also owns the health monitor of its view
    pub fn with_monitor(monitor: HealthMonitor) -> Self {
        let mut lifecycle = Self::new();
        lifecycle.monitor = Some(monitor);
        lifecycle
    }

    /// Must be called from within a tokio runtime when a monitor is attached.
    pub fn activate(&mut self) {
        if self.active {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.cancel = CancellationToken::new();
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.start();
        }
        self.active = true;
        debug!("View activated (generation {})", generation);
    }

    /// Safe to call any number of times
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }

        self.cancel.cancel();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.stop();
        }
        self.active = false;
        debug!("View deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Ticket for a request issued now; already stale if the view is inactive
    pub fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation.load(Ordering::Acquire),
            current: Arc::clone(&self.generation),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn monitor(&self) -> Option<&HealthMonitor> {
        self.monitor.as_ref()
    }

    /// Status feed of the attached monitor
    pub fn health(&self) -> Option<watch::Receiver<HealthStatus>> {
        self.monitor.as_ref().map(HealthMonitor::subscribe)
    }
}

impl Default for ViewLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewLifecycle {
    fn drop(&mut self) {
        self.deactivate();
    }
}
