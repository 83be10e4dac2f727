//! Cooperative cancellation and step counting.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Progress of a long operation, shared between the worker and the caller.
///
/// Clones observe the same flag and counter, so a caller keeps one clone
/// to cancel while the worker polls [`ProgressRange::more`].
#[derive(Debug, Clone, Default)]
pub struct ProgressRange {
    cancelled: Arc<AtomicBool>,
    done: Arc<AtomicUsize>,
    total: usize,
}

impl ProgressRange {
    /// Range expecting `total` steps.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Ask the worker to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// True while the worker may continue.
    pub fn more(&self) -> bool {
        !self.is_cancelled()
    }

    /// Record one completed step; returns [`more`](Self::more).
    pub fn step(&self) -> bool {
        self.done.fetch_add(1, Ordering::AcqRel);
        self.more()
    }

    /// Completed steps.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Acquire)
    }

    /// Completed fraction in `[0, 1]` (0 when no total was given).
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.done() as f64 / self.total as f64).min(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let p = ProgressRange::new(4);
        let handle = p.clone();
        assert!(p.step());
        assert!((p.fraction() - 0.25).abs() < 1e-12);
        handle.cancel();
        assert!(!p.more());
        assert!(!p.step());
        assert_eq!(handle.done(), 2);
    }
}
