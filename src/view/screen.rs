use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::watch;
use tracing::debug;

use super::lifecycle::ViewLifecycle;
use crate::health::{HealthMonitor, HealthStatus};
use crate::utils::AnalysisError;

/// What one screen currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub result: Option<T>,
    pub loading: bool,
    /// Inline message for the last rejected or failed submission
    pub notice: Option<AnalysisError>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            result: None,
            loading: false,
            notice: None,
        }
    }
}

/// How a submission ended, from the screen's point of view
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The result is on screen
    Applied,
    /// The call went out and failed; the notice is on screen
    Failed(AnalysisError),
    /// Nothing was sent (invalid input or a submission already pending)
    Rejected(AnalysisError),
    /// The screen was torn down before the outcome arrived; nothing was written
    Discarded,
}

/// One view instance: its result slot plus the lifecycle guarding it
pub struct Screen<T> {
    lifecycle: Mutex<ViewLifecycle>,
    state: Mutex<ViewState<T>>,
}

impl<T> Screen<T> {
    pub fn new() -> Self {
        Self::from_lifecycle(ViewLifecycle::new())
    }

    /// A screen that also drives the health indicator
    pub fn with_monitor(monitor: HealthMonitor) -> Self {
        Self::from_lifecycle(ViewLifecycle::with_monitor(monitor))
    }

    fn from_lifecycle(lifecycle: ViewLifecycle) -> Self {
        Self {
            lifecycle: Mutex::new(lifecycle),
            state: Mutex::new(ViewState::default()),
        }
    }

    /// Mount the screen
    pub fn activate(&self) {
        self.lifecycle.lock().activate();
    }

    /// Unmount the screen; its state is dropped and late results are ignored
    pub fn deactivate(&self) {
        self.lifecycle.lock().deactivate();
        *self.state.lock() = ViewState::default();
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.lock().is_active()
    }

    pub fn health(&self) -> Option<watch::Receiver<HealthStatus>> {
        self.lifecycle.lock().health()
    }

    pub fn snapshot(&self) -> ViewState<T>
    where
        T: Clone,
    {
        self.state.lock().clone()
    }

    pub fn result(&self) -> Option<T>
    where
        T: Clone,
    {
        self.state.lock().result.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Run a user submission
    ///
    /// An invalid `request` is reported inline and leaves the current result alone.
    /// Otherwise the result slot is cleared up front, `op` runs, and its outcome is
    /// applied only if this screen is still the activation that issued it.
    pub async fn submit<R, F, Fut>(&self, request: Result<R, AnalysisError>, op: F) -> Submission
    where
        F: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                self.state.lock().notice = Some(e.clone());
                return Submission::Rejected(e);
            }
        };

        let Some(ticket) = self.begin(true) else {
            return self.busy_or_discarded();
        };

        let Some(outcome) = ticket.run(op(request)).await else {
            debug!("Submission cancelled by teardown");
            return Submission::Discarded;
        };

        let mut state = self.state.lock();
        if !ticket.is_current() {
            debug!("Discarding result of a torn-down screen");
            return Submission::Discarded;
        }

        state.loading = false;
        match outcome {
            Ok(value) => {
                state.result = Some(value);
                Submission::Applied
            }
            Err(e) => {
                state.notice = Some(e.clone());
                Submission::Failed(e)
            }
        }
    }

    /// Reload read-only data; a failed reload keeps what is already on screen
    pub async fn refresh<Fut>(&self, op: Fut) -> Submission
    where
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        let Some(ticket) = self.begin(false) else {
            return self.busy_or_discarded();
        };

        let Some(outcome) = ticket.run(op).await else {
            return Submission::Discarded;
        };

        let mut state = self.state.lock();
        if !ticket.is_current() {
            return Submission::Discarded;
        }

        state.loading = false;
        match outcome {
            Ok(value) => {
                state.result = Some(value);
                state.notice = None;
                Submission::Applied
            }
            Err(e) => {
                state.notice = Some(e.clone());
                Submission::Failed(e)
            }
        }
    }

    /// Mark the screen loading and hand out a ticket; `None` if inactive or busy
    fn begin(&self, clear: bool) -> Option<super::lifecycle::Ticket> {
        let ticket = {
            let lifecycle = self.lifecycle.lock();
            if !lifecycle.is_active() {
                return None;
            }
            lifecycle.ticket()
        };

        let mut state = self.state.lock();
        if state.loading {
            return None;
        }
        if clear {
            state.result = None;
        }
        state.loading = true;
        state.notice = None;
        Some(ticket)
    }

    fn busy_or_discarded(&self) -> Submission {
        if self.is_active() {
            Submission::Rejected(AnalysisError::Busy)
        } else {
            Submission::Discarded
        }
    }
}

impl<T> Default for Screen<T> {
    fn default() -> Self {
        Self::new()
    }
}
