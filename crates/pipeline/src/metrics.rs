//! Flush and emission metrics
//!
//! Lock-free atomic counters, snapshotted for reporting. One
//! [`FlushMetrics`] per destination, one [`PipelineMetrics`] per pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one destination's flush activity
#[derive(Debug, Default)]
pub struct FlushMetrics {
    /// Primary sink write attempts
    pub attempts: AtomicU64,

    /// Chunks flushed and purged
    pub successes: AtomicU64,

    /// Retries scheduled after retryable failures
    pub retries: AtomicU64,

    /// Failures that exhausted the retry budget or were non-retryable
    pub permanent_failures: AtomicU64,

    /// Chunks handed to the secondary sink and accepted
    pub secondary_writes: AtomicU64,

    /// Chunks the secondary sink also refused
    pub secondary_failures: AtomicU64,

    /// Chunks dropped with no secondary configured
    pub dropped: AtomicU64,
}

impl FlushMetrics {
    pub const fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            permanent_failures: AtomicU64::new(0),
            secondary_writes: AtomicU64::new(0),
            secondary_failures: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_permanent_failure(&self) {
        self.permanent_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_secondary_write(&self) {
        self.secondary_writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_secondary_failure(&self) {
        self.secondary_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> FlushMetricsSnapshot {
        FlushMetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            permanent_failures: self.permanent_failures.load(Ordering::Relaxed),
            secondary_writes: self.secondary_writes.load(Ordering::Relaxed),
            secondary_failures: self.secondary_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`FlushMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushMetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub retries: u64,
    pub permanent_failures: u64,
    pub secondary_writes: u64,
    pub secondary_failures: u64,
    pub dropped: u64,
}

/// Counters for the event-facing pipeline surface
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Events accepted and written to a buffer
    pub events_emitted: AtomicU64,

    /// Events whose tag matched no routing rule
    pub events_unmatched: AtomicU64,
}

impl PipelineMetrics {
    pub const fn new() -> Self {
        Self {
            events_emitted: AtomicU64::new(0),
            events_unmatched: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_emitted(&self, count: u64) {
        self.events_emitted.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_unmatched(&self, count: u64) {
        self.events_unmatched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    pub fn events_unmatched(&self) -> u64 {
        self.events_unmatched.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = FlushMetrics::new();
        metrics.record_attempt();
        metrics.record_attempt();
        metrics.record_success();
        metrics.record_retry();

        let snap = metrics.snapshot();
        assert_eq!(snap.attempts, 2);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.retries, 1);
        assert_eq!(snap.permanent_failures, 0);
    }
}
