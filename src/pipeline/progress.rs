//! Live progress counters for a running update.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::FetchOutcome;

/// Point-in-time view of a run's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub accepted: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Counts completed and accepted schemes.
///
/// Shared freely across tasks. Snapshots taken mid-run may interleave with
/// concurrent updates; only the final counts are authoritative.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    processed: AtomicUsize,
    accepted: AtomicUsize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            accepted: AtomicUsize::new(0),
        }
    }

    /// Record one finished scheme.
    pub fn on_completion(&self, outcome: &FetchOutcome) {
        if outcome.is_accepted() {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        }
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            total: self.total,
        }
    }
}
