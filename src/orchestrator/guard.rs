use std::sync::atomic::{AtomicBool, Ordering};

use crate::utils::AnalysisError;

/// Admits at most one submission at a time; never queues
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    in_flight: AtomicBool,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or fail with `Busy` if another submission holds it
    pub fn acquire(&self) -> Result<Permit<'_>, AnalysisError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(AnalysisError::Busy);
        }
        Ok(Permit { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the slot when dropped, including when the submission future is dropped
#[derive(Debug)]
pub struct Permit<'a> {
    guard: &'a SubmissionGuard,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let guard = SubmissionGuard::new();
        let permit = guard.acquire().unwrap();
        assert!(guard.is_busy());
        assert_eq!(guard.acquire().unwrap_err(), AnalysisError::Busy);

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.acquire().is_ok());
    }
}
