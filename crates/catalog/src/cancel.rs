//! Cancellation token for in-flight scans.
//!
//! A scan checks the token at the start of each directory listing and each
//! per-file ingestion. Cancelling aborts the scan between suspension points:
//! already-issued upserts complete, not-yet-issued ones are skipped, and the
//! store is never left mid-merge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clonable cancellation flag shared by every task of one scan.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns true once `cancel` has been called on any clone.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
