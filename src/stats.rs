//! Per-run failure counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;
use strum::IntoEnumIterator;

use crate::error::ErrorKind;

/// Thread-safe failure counters, one per `ErrorKind`.
///
/// Every kind is pre-seeded with zero so incrementing never allocates.
/// Shared across jobs behind an `Arc`.
pub struct ErrorStats {
    counters: HashMap<ErrorKind, AtomicUsize>,
}

impl ErrorStats {
    /// Creates counters with every kind at zero.
    pub fn new() -> Self {
        let mut counters = HashMap::new();
        for kind in ErrorKind::iter() {
            counters.insert(kind, AtomicUsize::new(0));
        }
        ErrorStats { counters }
    }

    /// Bumps the counter for one failure kind.
    pub fn increment(&self, kind: ErrorKind) {
        // All ErrorKind variants are seeded in new(), so unwrap() is safe
        self.counters.get(&kind).unwrap().fetch_add(1, Ordering::Relaxed);
    }

    /// Current count for one failure kind.
    pub fn get_count(&self, kind: ErrorKind) -> usize {
        self.counters
            .get(&kind)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Sum of all counters.
    pub fn total(&self) -> usize {
        ErrorKind::iter().map(|kind| self.get_count(kind)).sum()
    }
}

/// Logs a per-kind failure summary, skipping kinds that never fired.
pub fn print_error_statistics(stats: &ErrorStats) {
    let total = stats.total();
    if total == 0 {
        return;
    }
    info!("Failure counts ({} total):", total);
    for kind in ErrorKind::iter() {
        let count = stats.get_count(kind);
        if count > 0 {
            info!("   {}: {}", kind.as_str(), count);
        }
    }
}
