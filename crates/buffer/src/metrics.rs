//! Buffer metrics
//!
//! Atomic counters shared between the buffer and whoever reports on it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by every buffer
#[derive(Debug, Default)]
pub struct BufferMetrics {
    /// Staged chunks created
    pub chunks_created: AtomicU64,

    /// Chunks closed and moved to the flush queue
    pub chunks_enqueued: AtomicU64,

    /// Chunks purged after a successful flush
    pub chunks_purged: AtomicU64,

    /// Chunks dropped (eviction, permanent failure, drain timeout)
    pub chunks_dropped: AtomicU64,

    /// Events accepted by `write`
    pub events_written: AtomicU64,

    /// Writes rejected under the `error` overflow policy
    pub overflow_errors: AtomicU64,

    /// Writes that blocked waiting for space
    pub writes_blocked: AtomicU64,

    /// Current payload bytes across all chunks
    pub bytes_used: AtomicU64,

    /// Current records across all chunks
    pub records_buffered: AtomicU64,
}

impl BufferMetrics {
    /// Create a zeroed metrics instance
    pub const fn new() -> Self {
        Self {
            chunks_created: AtomicU64::new(0),
            chunks_enqueued: AtomicU64::new(0),
            chunks_purged: AtomicU64::new(0),
            chunks_dropped: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            overflow_errors: AtomicU64::new(0),
            writes_blocked: AtomicU64::new(0),
            bytes_used: AtomicU64::new(0),
            records_buffered: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_chunk_created(&self) {
        self.chunks_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_enqueued(&self) {
        self.chunks_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_purged(&self) {
        self.chunks_purged.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_events(&self, count: u64) {
        self.events_written.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_overflow(&self) {
        self.overflow_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_blocked(&self) {
        self.writes_blocked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_usage(&self, bytes: u64, records: u64) {
        self.bytes_used.fetch_add(bytes, Ordering::Relaxed);
        self.records_buffered.fetch_add(records, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn sub_usage(&self, bytes: u64, records: u64) {
        self.bytes_used.fetch_sub(bytes, Ordering::Relaxed);
        self.records_buffered.fetch_sub(records, Ordering::Relaxed);
    }

    /// Current payload bytes across all chunks
    #[inline]
    pub fn bytes_used(&self) -> u64 {
        self.bytes_used.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> BufferMetricsSnapshot {
        BufferMetricsSnapshot {
            chunks_created: self.chunks_created.load(Ordering::Relaxed),
            chunks_enqueued: self.chunks_enqueued.load(Ordering::Relaxed),
            chunks_purged: self.chunks_purged.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            overflow_errors: self.overflow_errors.load(Ordering::Relaxed),
            writes_blocked: self.writes_blocked.load(Ordering::Relaxed),
            bytes_used: self.bytes_used.load(Ordering::Relaxed),
            records_buffered: self.records_buffered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of buffer metrics
#[derive(Debug, Clone, Copy)]
pub struct BufferMetricsSnapshot {
    pub chunks_created: u64,
    pub chunks_enqueued: u64,
    pub chunks_purged: u64,
    pub chunks_dropped: u64,
    pub events_written: u64,
    pub overflow_errors: u64,
    pub writes_blocked: u64,
    pub bytes_used: u64,
    pub records_buffered: u64,
}
