//! Coarse flags shared between the update loop and background tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Non-reentrant "working" flag guarding bulk level operations.
///
/// Only one holder can exist at a time. A second caller gets `None` and is
/// expected to fail immediately rather than wait.
#[derive(Clone, Debug, Default)]
pub struct ProgressFlag {
    working: Arc<AtomicBool>,
}

impl ProgressFlag {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a bulk operation is in flight.
    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::Acquire)
    }

    /// Sets the flag if it is clear.
    ///
    /// # Returns
    /// A guard clearing the flag when dropped, or `None` if the flag was
    /// already set.
    pub fn try_begin(&self) -> Option<ProgressGuard> {
        self.working
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProgressGuard {
                working: self.working.clone(),
            })
    }
}

/// Holds a [`ProgressFlag`] set for as long as it lives.
#[derive(Debug)]
pub struct ProgressGuard {
    working: Arc<AtomicBool>,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.working.store(false, Ordering::Release);
    }
}

/// Cooperative cancellation signal, raised when the application is closing.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the token. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the token was raised.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
