//! The buffer: staged → queued → flushing chunk management
//!
//! Producers append to staged chunks keyed by [`Metadata`]; the flush
//! controller closes, dequeues, and resolves them. Locking is scoped: the
//! stage map and the flush queue have separate mutexes, and each chunk has
//! its own lock, so producers are never blocked by flush activity except
//! under the `block` overflow policy.
//!
//! Lock order is stage/queue before chunk, never the reverse. Capacity
//! accounting lives in the shared atomic metrics, so the overflow check
//! takes no lock at all.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::chunk::{Chunk, ChunkId, FlushChunk, RetryState};
use crate::clock::Clock;
use crate::config::{BufferConfig, ChunkingConfig, OverflowPolicy};
use crate::error::{BufferError, Result};
use crate::event::{encode_batch, EventTime, Record};
use crate::metadata::Metadata;
use crate::metrics::BufferMetrics;

/// A chunk in the flush queue, with its retry bookkeeping if any
struct QueueEntry {
    chunk: Arc<Mutex<Chunk>>,
    retry: Option<RetryState>,
}

#[derive(Default)]
struct FlushQueue {
    /// Closed chunks awaiting flush, oldest first
    queued: VecDeque<QueueEntry>,
    /// Chunks checked out by in-flight flush attempts
    flushing: HashMap<ChunkId, QueueEntry>,
}

/// Chunked event buffer for one destination
pub struct Buffer {
    config: BufferConfig,
    chunking: ChunkingConfig,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,

    /// Staged chunk per metadata key
    stage: Mutex<HashMap<Metadata, Arc<Mutex<Chunk>>>>,

    /// Queued and flushing chunks
    queue: Mutex<FlushQueue>,

    /// Writers blocked under the `block` policy, woken in FIFO order
    waiters: Mutex<VecDeque<Arc<Notify>>>,

    metrics: Arc<BufferMetrics>,
}

impl Buffer {
    /// Create a buffer with the given limits and chunking dimensions
    ///
    /// The cancellation token aborts blocked writers at shutdown.
    #[must_use]
    pub fn new(
        config: BufferConfig,
        chunking: ChunkingConfig,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            chunking,
            clock,
            shutdown,
            stage: Mutex::new(HashMap::new()),
            queue: Mutex::new(FlushQueue::default()),
            waiters: Mutex::new(VecDeque::new()),
            metrics: Arc::new(BufferMetrics::new()),
        }
    }

    /// Derive the chunk key for an event under this buffer's chunking config
    #[must_use]
    pub fn metadata_for(&self, tag: &str, time: EventTime, record: &Record) -> Metadata {
        Metadata::for_event(tag, time, record, &self.chunking)
    }

    /// Append an event batch to the staged chunk identified by `metadata`
    ///
    /// Events in the batch are appended in order and land in one chunk
    /// unless a size or record limit closes the chunk part-way through the
    /// caller's sequence of writes. Appends for the same key are serialized
    /// by the chunk's own lock, preserving call order.
    ///
    /// # Errors
    ///
    /// - [`BufferError::Overflow`] when full under the `error` policy
    /// - [`BufferError::ShuttingDown`] when a blocked write is cancelled
    /// - [`BufferError::BatchTooLarge`] when the serialized batch cannot
    ///   fit in any single chunk
    pub async fn write(&self, metadata: Metadata, events: &[(EventTime, Record)]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        if self.shutdown.is_cancelled() {
            return Err(BufferError::ShuttingDown);
        }

        let encoded = encode_batch(events)?;
        if encoded.len() > self.config.max_chunk_bytes {
            return Err(BufferError::BatchTooLarge {
                size: encoded.len(),
                limit: self.config.max_chunk_bytes,
            });
        }

        self.reserve(encoded.len()).await?;

        loop {
            let chunk_arc = {
                let mut stage = self.stage.lock();
                Arc::clone(stage.entry(metadata.clone()).or_insert_with(|| {
                    self.metrics.record_chunk_created();
                    Arc::new(Mutex::new(Chunk::new(
                        metadata.clone(),
                        self.clock.now_unix(),
                    )))
                }))
            };

            let mut chunk = chunk_arc.lock();
            if !chunk.is_staged() {
                // raced with a close between the map and chunk locks
                continue;
            }

            if chunk.size() > 0 && chunk.size() + encoded.len() > self.config.max_chunk_bytes {
                drop(chunk);
                self.close_staged(&metadata);
                continue;
            }

            chunk.append(&encoded, events.len(), self.clock.now_unix())?;
            let full = chunk.size() >= self.config.max_chunk_bytes
                || self
                    .config
                    .max_chunk_records
                    .is_some_and(|limit| chunk.records() >= limit);
            drop(chunk);

            self.metrics
                .add_usage(encoded.len() as u64, events.len() as u64);
            self.metrics.record_events(events.len() as u64);

            if full {
                self.close_staged(&metadata);
            }
            return Ok(());
        }
    }

    /// Wait (or fail) until `needed` more bytes fit under the total limit
    async fn reserve(&self, needed: usize) -> Result<()> {
        loop {
            let used = self.metrics.bytes_used() as usize;
            if used.saturating_add(needed) <= self.config.max_total_bytes {
                return Ok(());
            }

            match self.config.overflow {
                OverflowPolicy::Error => {
                    self.metrics.record_overflow();
                    return Err(BufferError::Overflow {
                        needed,
                        limit: self.config.max_total_bytes,
                    });
                }
                OverflowPolicy::DropOldest => {
                    if !self.evict_oldest() {
                        // nothing queued to evict; staged data alone is over
                        // the limit, so failing is the only honest option
                        self.metrics.record_overflow();
                        return Err(BufferError::Overflow {
                            needed,
                            limit: self.config.max_total_bytes,
                        });
                    }
                }
                OverflowPolicy::Block => {
                    self.metrics.record_blocked();
                    self.wait_for_space().await?;
                }
            }
        }
    }

    /// Park the caller until space frees or shutdown cancels it
    async fn wait_for_space(&self) -> Result<()> {
        let waiter = Arc::new(Notify::new());
        self.waiters.lock().push_back(Arc::clone(&waiter));

        tokio::select! {
            _ = waiter.notified() => Ok(()),
            _ = self.shutdown.cancelled() => {
                self.waiters.lock().retain(|w| !Arc::ptr_eq(w, &waiter));
                Err(BufferError::ShuttingDown)
            }
        }
    }

    /// Wake the longest-waiting blocked writer, if any
    fn notify_space(&self) {
        if let Some(waiter) = self.waiters.lock().pop_front() {
            waiter.notify_one();
        }
    }

    /// Close the staged chunk for a key and move it to the flush queue
    fn close_staged(&self, metadata: &Metadata) {
        let removed = self.stage.lock().remove(metadata);
        let Some(chunk_arc) = removed else {
            return;
        };

        let enqueued = {
            let mut chunk = chunk_arc.lock();
            match chunk.enqueue() {
                Ok(()) => {
                    tracing::debug!(
                        chunk = %chunk.id(),
                        records = chunk.records(),
                        bytes = chunk.size(),
                        "chunk enqueued"
                    );
                    true
                }
                Err(e) => {
                    tracing::error!(error = %e, "staged chunk refused to close");
                    false
                }
            }
        };

        if enqueued {
            self.metrics.record_enqueued();
            self.queue.lock().queued.push_back(QueueEntry {
                chunk: chunk_arc,
                retry: None,
            });
        }
    }

    /// Close staged chunks that are past their staged age or time bucket
    ///
    /// Returns the number of chunks closed.
    pub fn enqueue_expired(&self) -> usize {
        let now = self.clock.now_unix();
        let expired: Vec<Metadata> = {
            let stage = self.stage.lock();
            stage
                .iter()
                .filter(|(_, chunk_arc)| self.is_expired(&chunk_arc.lock(), now))
                .map(|(metadata, _)| metadata.clone())
                .collect()
        };

        for metadata in &expired {
            self.close_staged(metadata);
        }
        expired.len()
    }

    fn is_expired(&self, chunk: &Chunk, now: i64) -> bool {
        if chunk.age(now) >= self.config.max_staged_secs as i64 {
            return true;
        }
        if let (Some(interval), Some(timekey)) =
            (self.chunking.timekey_secs, chunk.metadata().timekey())
        {
            let deadline = timekey + interval as i64 + self.chunking.timekey_wait_secs as i64;
            if now >= deadline {
                return true;
            }
        }
        false
    }

    /// Close every staged chunk regardless of age (shutdown, forced flush)
    ///
    /// Returns the number of chunks closed.
    pub fn flush_all(&self) -> usize {
        let keys: Vec<Metadata> = self.stage.lock().keys().cloned().collect();
        for metadata in &keys {
            self.close_staged(metadata);
        }
        keys.len()
    }

    /// Check out the oldest queued chunk whose retry deadline has passed
    ///
    /// The returned view is exclusively owned by the caller's flush attempt
    /// until it resolves via [`ack`](Self::ack), [`requeue`](Self::requeue),
    /// or [`purge`](Self::purge). Concurrent callers never receive the same
    /// chunk.
    pub fn dequeue_ready(&self) -> Option<(FlushChunk, Option<RetryState>)> {
        let now = self.clock.now_unix();
        let mut queue = self.queue.lock();

        let index = queue
            .queued
            .iter()
            .position(|entry| entry.retry.map_or(true, |r| now >= r.not_before))?;

        // checkout first; the entry leaves the queue only once it succeeds,
        // so a refused transition cannot strand the chunk's accounting
        let chunk_arc = Arc::clone(&queue.queued[index].chunk);
        let view = {
            let mut chunk = chunk_arc.lock();
            if let Err(e) = chunk.checkout() {
                tracing::error!(error = %e, "chunk in flush queue was not queued");
                return None;
            }
            chunk.flush_view()
        };

        let entry = queue.queued.remove(index)?;
        let retry = entry.retry;
        queue.flushing.insert(view.id, entry);
        Some((view, retry))
    }

    fn remove_flushing(&self, id: ChunkId) -> Result<QueueEntry> {
        self.queue
            .lock()
            .flushing
            .remove(&id)
            .ok_or(BufferError::UnknownChunk(id))
    }

    /// Purge a successfully flushed chunk and release its accounting
    pub fn ack(&self, id: ChunkId) -> Result<()> {
        let entry = self.remove_flushing(id)?;
        self.release_entry(&entry);
        self.metrics.record_purged();
        Ok(())
    }

    /// Drop a chunk that will never flush (permanent failure, drain timeout)
    pub fn purge(&self, id: ChunkId) -> Result<()> {
        let entry = self.remove_flushing(id)?;
        self.release_entry(&entry);
        self.metrics.record_dropped();
        Ok(())
    }

    /// Return a checked-out chunk to the queue for a later retry
    ///
    /// The chunk goes back to the front of the queue (it was the oldest
    /// ready chunk) and is not dispatched again before `retry.not_before`.
    pub fn requeue(&self, id: ChunkId, retry: RetryState) -> Result<()> {
        let mut queue = self.queue.lock();
        let mut entry = queue
            .flushing
            .remove(&id)
            .ok_or(BufferError::UnknownChunk(id))?;
        entry.chunk.lock().release()?;
        entry.retry = Some(retry);
        queue.queued.push_front(entry);
        Ok(())
    }

    /// Subtract an entry's accounting and wake a blocked writer
    fn release_entry(&self, entry: &QueueEntry) {
        let chunk = entry.chunk.lock();
        self.metrics
            .sub_usage(chunk.size() as u64, chunk.records() as u64);
        drop(chunk);
        self.notify_space();
    }

    /// Evict the oldest queued chunk under the `drop_oldest` policy
    fn evict_oldest(&self) -> bool {
        let entry = self.queue.lock().queued.pop_front();
        let Some(entry) = entry else {
            return false;
        };

        {
            let chunk = entry.chunk.lock();
            tracing::warn!(
                chunk = %chunk.id(),
                records = chunk.records(),
                bytes = chunk.size(),
                "evicting oldest queued chunk to admit new write"
            );
        }
        self.release_entry(&entry);
        self.metrics.record_dropped();
        true
    }

    /// Remove and return every queued and flushing chunk
    ///
    /// Used after the drain grace period: the caller hands the views to a
    /// secondary sink or reports them lost. Accounting is released here.
    pub fn take_remaining(&self) -> Vec<FlushChunk> {
        let entries: Vec<QueueEntry> = {
            let mut queue = self.queue.lock();
            let mut entries: Vec<QueueEntry> = queue.queued.drain(..).collect();
            entries.extend(queue.flushing.drain().map(|(_, entry)| entry));
            entries
        };

        let mut views = Vec::with_capacity(entries.len());
        for entry in &entries {
            self.release_entry(entry);
            views.push(entry.chunk.lock().flush_view());
        }
        views
    }

    /// Number of staged chunks
    pub fn staged_count(&self) -> usize {
        self.stage.lock().len()
    }

    /// Number of queued chunks
    pub fn queued_count(&self) -> usize {
        self.queue.lock().queued.len()
    }

    /// Number of chunks checked out by flush attempts
    pub fn flushing_count(&self) -> usize {
        self.queue.lock().flushing.len()
    }

    /// Check whether no chunks remain in any state
    pub fn is_drained(&self) -> bool {
        self.staged_count() == 0 && {
            let queue = self.queue.lock();
            queue.queued.is_empty() && queue.flushing.is_empty()
        }
    }

    /// Buffer metrics
    #[inline]
    pub fn metrics(&self) -> &Arc<BufferMetrics> {
        &self.metrics
    }

    /// Buffer limits
    #[inline]
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("staged", &self.staged_count())
            .field("queued", &self.queued_count())
            .field("flushing", &self.flushing_count())
            .field("bytes_used", &self.metrics.bytes_used())
            .finish()
    }
}
