//! The flush controller
//!
//! One controller per destination. It runs a periodic scheduling pass that
//! closes expired staged chunks, dequeues ready chunks oldest-first, and
//! dispatches flush attempts bounded by a concurrency limit. Failed
//! attempts release their concurrency slot immediately; the chunk waits
//! out its backoff inside the buffer queue, so a failing chunk never
//! parks a flush worker.
//!
//! Resolution per attempt:
//!
//! ```text
//! Sink.write ── Ok ──────────────→ Buffer.ack (purged)
//!            ── Err(Retryable) ──→ budget left?  yes → Buffer.requeue
//!            ── Err(Permanent) ─┐               no ──┐
//!                               └──→ secondary sink ─┴→ ack or purge
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use relay_buffer::{Buffer, Clock, FlushChunk, RetryState};

use crate::error::{PipelineError, Result};
use crate::metrics::FlushMetrics;
use crate::retry::RetryConfig;
use crate::sink::Sink;

/// How long drain waits between scheduling passes
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Scheduling parameters for one destination's flush loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Seconds between scheduling passes
    pub interval_secs: u64,

    /// Maximum in-flight flush attempts at once
    pub concurrency: usize,

    /// Seconds the shutdown drain may keep flushing before remaining
    /// chunks are handed to the secondary sink or reported lost
    pub drain_grace_secs: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            concurrency: 1,
            drain_grace_secs: 10,
        }
    }
}

/// Flush orchestration for one destination
///
/// Clones share the buffer, concurrency slots, and metrics; dispatch
/// hands a clone to each spawned flush attempt.
#[derive(Clone)]
pub struct FlushController {
    name: String,
    buffer: Arc<Buffer>,
    sink: Arc<dyn Sink>,
    secondary: Option<Arc<dyn Sink>>,
    flush: FlushConfig,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    slots: Arc<Semaphore>,
    metrics: Arc<FlushMetrics>,
}

impl FlushController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        buffer: Arc<Buffer>,
        sink: Arc<dyn Sink>,
        secondary: Option<Arc<dyn Sink>>,
        flush: FlushConfig,
        retry: RetryConfig,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        let concurrency = flush.concurrency.max(1);
        Self {
            name: name.into(),
            buffer,
            sink,
            secondary,
            flush,
            retry,
            clock,
            shutdown,
            slots: Arc::new(Semaphore::new(concurrency)),
            metrics: Arc::new(FlushMetrics::new()),
        }
    }

    /// The buffer this controller drains
    #[inline]
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Flush metrics for this destination
    #[inline]
    pub fn metrics(&self) -> &Arc<FlushMetrics> {
        &self.metrics
    }

    /// Destination name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One scheduling pass: close expired chunks, then flush what is ready
    ///
    /// Attempts run concurrently up to the configured limit; the pass
    /// returns once every attempt it dispatched has resolved.
    pub async fn tick(&self) {
        self.buffer.enqueue_expired();
        self.dispatch_ready().await;
    }

    /// Dequeue ready chunks and run flush attempts until none remain
    async fn dispatch_ready(&self) {
        let mut attempts = JoinSet::new();

        loop {
            let Ok(permit) = Arc::clone(&self.slots).acquire_owned().await else {
                break;
            };
            let Some((chunk, retry)) = self.buffer.dequeue_ready() else {
                drop(permit);
                break;
            };

            let controller = self.clone();
            attempts.spawn(async move {
                controller.flush_chunk(chunk, retry).await;
                drop(permit);
            });
        }

        while attempts.join_next().await.is_some() {}
    }

    /// Run one flush attempt and resolve it against the buffer
    async fn flush_chunk(&self, chunk: FlushChunk, previous: Option<RetryState>) {
        self.metrics.record_attempt();

        match self.sink.write(&chunk).await {
            Ok(()) => {
                self.metrics.record_success();
                tracing::debug!(
                    destination = %self.name,
                    chunk = %chunk.id,
                    records = chunk.records,
                    "chunk flushed"
                );
                if let Err(e) = self.buffer.ack(chunk.id) {
                    tracing::error!(destination = %self.name, error = %e, "ack failed");
                }
            }
            Err(e) if e.is_retryable() => {
                match self.retry.next_retry(previous, self.clock.now_unix()) {
                    Some(state) => {
                        self.metrics.record_retry();
                        tracing::warn!(
                            destination = %self.name,
                            chunk = %chunk.id,
                            attempts = state.attempts,
                            not_before = state.not_before,
                            error = %e,
                            "flush failed, retry scheduled"
                        );
                        if let Err(e) = self.buffer.requeue(chunk.id, state) {
                            tracing::error!(destination = %self.name, error = %e, "requeue failed");
                        }
                    }
                    None => {
                        self.fail_permanently(chunk, &format!("retry budget exhausted: {e}"))
                            .await;
                    }
                }
            }
            Err(e) => self.fail_permanently(chunk, &e.to_string()).await,
        }
    }

    /// Resolve a chunk the primary sink will never accept
    ///
    /// With a secondary sink configured the chunk gets exactly one attempt
    /// there; otherwise, or if the secondary also refuses, the chunk is
    /// dropped with an error-level report.
    async fn fail_permanently(&self, chunk: FlushChunk, reason: &str) {
        self.metrics.record_permanent_failure();

        if let Some(secondary) = &self.secondary {
            match secondary.write(&chunk).await {
                Ok(()) => {
                    self.metrics.record_secondary_write();
                    tracing::warn!(
                        destination = %self.name,
                        chunk = %chunk.id,
                        secondary = secondary.name(),
                        reason,
                        "chunk handed to secondary sink"
                    );
                    if let Err(e) = self.buffer.ack(chunk.id) {
                        tracing::error!(destination = %self.name, error = %e, "ack failed");
                    }
                    return;
                }
                Err(e) => {
                    self.metrics.record_secondary_failure();
                    tracing::error!(
                        destination = %self.name,
                        chunk = %chunk.id,
                        records = chunk.records,
                        secondary = secondary.name(),
                        reason,
                        error = %e,
                        "secondary sink also failed, dropping chunk"
                    );
                }
            }
        } else {
            tracing::error!(
                destination = %self.name,
                chunk = %chunk.id,
                records = chunk.records,
                reason,
                "no secondary sink, dropping chunk"
            );
        }

        self.metrics.record_dropped();
        if let Err(e) = self.buffer.purge(chunk.id) {
            tracing::error!(destination = %self.name, error = %e, "purge failed");
        }
    }

    /// Run the flush loop until shutdown, then drain
    pub async fn run(&self) -> Result<()> {
        let period = Duration::from_secs(self.flush.interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = self.shutdown.cancelled() => break,
            }
        }

        self.drain().await
    }

    /// Flush everything outstanding within the drain grace period
    ///
    /// Staged chunks are force-closed first. Whatever survives the grace
    /// period goes to the secondary sink (one attempt each) or is reported
    /// lost via [`PipelineError::ShutdownTimeout`].
    pub async fn drain(&self) -> Result<()> {
        let closed = self.buffer.flush_all();
        tracing::info!(
            destination = %self.name,
            closed,
            queued = self.buffer.queued_count(),
            "draining"
        );

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.flush.drain_grace_secs);
        while !self.buffer.is_drained() && tokio::time::Instant::now() < deadline {
            self.dispatch_ready().await;
            if self.buffer.is_drained() {
                break;
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }

        if self.buffer.is_drained() {
            tracing::info!(destination = %self.name, "drain complete");
            return Ok(());
        }

        let remaining = self.buffer.take_remaining();
        let mut lost = 0;
        for chunk in remaining {
            if let Some(secondary) = &self.secondary {
                match secondary.write(&chunk).await {
                    Ok(()) => {
                        self.metrics.record_secondary_write();
                        continue;
                    }
                    Err(e) => {
                        self.metrics.record_secondary_failure();
                        tracing::error!(
                            destination = %self.name,
                            chunk = %chunk.id,
                            records = chunk.records,
                            error = %e,
                            "chunk lost at shutdown, secondary refused it"
                        );
                    }
                }
            } else {
                tracing::error!(
                    destination = %self.name,
                    chunk = %chunk.id,
                    records = chunk.records,
                    "chunk lost at shutdown"
                );
            }
            lost += 1;
        }

        if lost > 0 {
            Err(PipelineError::ShutdownTimeout { remaining: lost })
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for FlushController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushController")
            .field("name", &self.name)
            .field("buffer", &self.buffer)
            .field("sink", &self.sink.name())
            .finish()
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;
