//! Outcome counters for one batch run.
//!
//! Includes:
//! - `Outcome`: what happened to one file.
//! - `Tally`: lock-free counters shared across the transform workers.
//! - `TallySummary`: the frozen counts reported when the job finishes.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-file result. `Fallback` means the transform failed and the source
/// bytes were copied verbatim instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Transformed,
    Fallback,
    Skipped,
}

/// Running counters, incremented from the worker pool.
#[derive(Debug, Default)]
pub struct Tally {
    total: AtomicU64,
    success: AtomicU64,
    errors: AtomicU64,
    skipped: AtomicU64,
}

impl Tally {
    /// Count one handled file under exactly one bucket.
    pub fn record(&self, outcome: Outcome) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let bucket = match outcome {
            Outcome::Transformed => &self.success,
            Outcome::Fallback => &self.errors,
            Outcome::Skipped => &self.skipped,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TallySummary {
        TallySummary {
            total: self.total.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Final counts of one job: `total` is always the sum of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TallySummary {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    pub skipped: u64,
}

impl TallySummary {
    pub fn is_balanced(&self) -> bool {
        self.total == self.success + self.errors + self.skipped
    }
}
