// Progress accounting
//
// Decision: Lock-free. The dispatch loop adds to the expected total while any
// number of workers bump the processed count; readers may poll at any time.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Ratio reported before any INIT_MONITORING message was seen
pub const PROGRESS_UNINITIALIZED: f64 = -1.0;

/// Point-in-time copy of the progress counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct ProgressState {
    pub initialized: bool,
    pub expected_total: u64,
    pub processed: u64,
}

impl ProgressState {
    /// processed / expected_total; -1 before initialization, 0 when nothing is expected
    pub fn ratio(&self) -> f64 {
        if !self.initialized {
            return PROGRESS_UNINITIALIZED;
        }
        if self.expected_total == 0 {
            return 0.0;
        }
        self.processed as f64 / self.expected_total as f64
    }
}

/// Thread-safe progress counters of one run
#[derive(Debug, Default)]
pub struct ProgressMonitor {
    initialized: AtomicBool,
    expected_total: AtomicU64,
    processed: AtomicU64,
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` to the expected total and mark the monitor initialized
    ///
    /// Returns the new expected total.
    pub fn record_expected(&self, n: u64) -> u64 {
        let previous = self
            .expected_total
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |total| {
                Some(total.saturating_add(n))
            })
            .unwrap_or_else(|total| total);
        self.initialized.store(true, Ordering::Release);
        previous.saturating_add(n)
    }

    /// Count one successfully processed unit
    pub fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn expected_total(&self) -> u64 {
        self.expected_total.load(Ordering::Acquire)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            initialized: self.is_initialized(),
            expected_total: self.expected_total(),
            processed: self.processed(),
        }
    }

    /// Current progress ratio, see [`ProgressState::ratio`]
    pub fn ratio(&self) -> f64 {
        self.snapshot().ratio()
    }
}
