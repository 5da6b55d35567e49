//! Tests for flush orchestration
//!
//! A scripted mock sink drives every controller path: success, retry with
//! backoff, budget exhaustion, secondary handoff, and shutdown drain. The
//! buffer clock is manual, so retry deadlines move only when a test says so.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use relay_buffer::{
    Buffer, BufferConfig, ChunkingConfig, Clock, FlushChunk, ManualClock, Metadata, Record,
};

use crate::controller::{FlushConfig, FlushController};
use crate::error::PipelineError;
use crate::retry::RetryConfig;
use crate::sink::{Sink, SinkError};

#[derive(Clone, Copy)]
enum Outcome {
    Succeed,
    FailRetryable,
    FailPermanent,
}

/// Sink that replays a scripted outcome per write, then a fallback
struct MockSink {
    name: &'static str,
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    calls: Mutex<Vec<FlushChunk>>,
}

impl MockSink {
    fn ok(name: &'static str) -> Arc<Self> {
        Self::new(name, vec![], Outcome::Succeed)
    }

    fn always_retryable(name: &'static str) -> Arc<Self> {
        Self::new(name, vec![], Outcome::FailRetryable)
    }

    fn always_permanent(name: &'static str) -> Arc<Self> {
        Self::new(name, vec![], Outcome::FailPermanent)
    }

    fn scripted(name: &'static str, script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Self::new(name, script, fallback)
    }

    fn new(name: &'static str, script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(Self {
            name,
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn calls(&self) -> Vec<FlushChunk> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Sink for MockSink {
    fn name(&self) -> &str {
        self.name
    }

    async fn write(&self, chunk: &FlushChunk) -> Result<(), SinkError> {
        self.calls.lock().push(chunk.clone());
        let outcome = self.script.lock().pop_front().unwrap_or(self.fallback);
        match outcome {
            Outcome::Succeed => Ok(()),
            Outcome::FailRetryable => Err(SinkError::retryable("simulated outage")),
            Outcome::FailPermanent => Err(SinkError::permanent("payload rejected")),
        }
    }
}

struct Harness {
    controller: Arc<FlushController>,
    buffer: Arc<Buffer>,
    clock: Arc<ManualClock>,
    shutdown: CancellationToken,
}

impl Harness {
    fn new(
        sink: Arc<MockSink>,
        secondary: Option<Arc<MockSink>>,
        retry: RetryConfig,
        flush: FlushConfig,
    ) -> Self {
        let clock = Arc::new(ManualClock::starting_at(1000));
        let shutdown = CancellationToken::new();
        let buffer = Arc::new(Buffer::new(
            BufferConfig::default(),
            ChunkingConfig::default(),
            clock.clone(),
            shutdown.clone(),
        ));
        let controller = Arc::new(FlushController::new(
            "primary",
            buffer.clone(),
            sink,
            secondary.map(|s| s as Arc<dyn Sink>),
            flush,
            retry,
            clock.clone(),
            shutdown.clone(),
        ));
        Self {
            controller,
            buffer,
            clock,
            shutdown,
        }
    }

    async fn emit(&self, msg: &str) {
        let mut record = Record::new();
        record.insert("msg".into(), Value::String(msg.into()));
        self.buffer
            .write(Metadata::default(), &[(self.clock.now_unix(), record)])
            .await
            .unwrap();
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: Some(10),
        max_elapsed_secs: None,
        base_delay_secs: 1,
        max_delay_secs: 4,
    }
}

// =============================================================================
// Flush resolution
// =============================================================================

#[tokio::test]
async fn test_fails_twice_then_succeeds_with_full_payload() {
    let sink = MockSink::scripted(
        "flaky",
        vec![Outcome::FailRetryable, Outcome::FailRetryable],
        Outcome::Succeed,
    );
    let h = Harness::new(sink.clone(), None, fast_retry(), FlushConfig::default());

    h.emit("first").await;
    h.emit("second").await;

    // staged chunk expires at max age, then the flush attempt fails
    h.clock.advance(60);
    h.controller.tick().await;
    assert_eq!(sink.call_count(), 1);
    assert_eq!(h.buffer.queued_count(), 1);

    // retry deadline is at most backoff * 1.5; advance well past it
    h.clock.advance(10);
    h.controller.tick().await;
    assert_eq!(sink.call_count(), 2);

    h.clock.advance(10);
    h.controller.tick().await;
    assert_eq!(sink.call_count(), 3);

    // every attempt carried the full two-event payload
    for chunk in sink.calls() {
        assert_eq!(chunk.records, 2);
        let text = String::from_utf8(chunk.payload.to_vec()).unwrap();
        assert!(text.contains("first"));
        assert!(text.contains("second"));
    }

    assert!(h.buffer.is_drained());
    let snap = h.controller.metrics().snapshot();
    assert_eq!(snap.attempts, 3);
    assert_eq!(snap.successes, 1);
    assert_eq!(snap.retries, 2);
    assert_eq!(snap.permanent_failures, 0);
}

#[tokio::test]
async fn test_retry_deadline_gates_redispatch() {
    let sink = MockSink::always_retryable("down");
    let h = Harness::new(sink.clone(), None, fast_retry(), FlushConfig::default());

    h.emit("only").await;
    h.buffer.flush_all();
    h.controller.tick().await;
    assert_eq!(sink.call_count(), 1);

    // clock has not moved; the chunk is still backing off
    h.controller.tick().await;
    h.controller.tick().await;
    assert_eq!(sink.call_count(), 1);
}

#[tokio::test]
async fn test_permanent_failure_goes_to_secondary_once() {
    let sink = MockSink::always_permanent("strict");
    let secondary = MockSink::ok("fallback");
    let h = Harness::new(
        sink.clone(),
        Some(secondary.clone()),
        fast_retry(),
        FlushConfig::default(),
    );

    h.emit("first").await;
    h.emit("second").await;
    h.buffer.flush_all();
    h.controller.tick().await;

    assert_eq!(sink.call_count(), 1);
    assert_eq!(secondary.call_count(), 1);
    assert_eq!(secondary.calls()[0].records, 2);
    assert!(h.buffer.is_drained());

    // no further primary retries
    h.clock.advance(600);
    h.controller.tick().await;
    assert_eq!(sink.call_count(), 1);

    let snap = h.controller.metrics().snapshot();
    assert_eq!(snap.permanent_failures, 1);
    assert_eq!(snap.secondary_writes, 1);
    assert_eq!(snap.dropped, 0);
}

#[tokio::test]
async fn test_exhausted_budget_drops_without_secondary() {
    let sink = MockSink::always_retryable("down");
    let retry = RetryConfig {
        max_attempts: Some(1),
        ..fast_retry()
    };
    let h = Harness::new(sink.clone(), None, retry, FlushConfig::default());

    h.emit("doomed").await;
    h.buffer.flush_all();

    h.controller.tick().await;
    h.clock.advance(10);
    h.controller.tick().await;

    assert_eq!(sink.call_count(), 2);
    assert!(h.buffer.is_drained());
    assert_eq!(h.buffer.metrics().snapshot().chunks_dropped, 1);

    let snap = h.controller.metrics().snapshot();
    assert_eq!(snap.retries, 1);
    assert_eq!(snap.permanent_failures, 1);
    assert_eq!(snap.dropped, 1);
}

#[tokio::test]
async fn test_secondary_failure_drops_the_chunk() {
    let sink = MockSink::always_permanent("strict");
    let secondary = MockSink::always_permanent("also-strict");
    let h = Harness::new(
        sink.clone(),
        Some(secondary.clone()),
        fast_retry(),
        FlushConfig::default(),
    );

    h.emit("doomed").await;
    h.buffer.flush_all();
    h.controller.tick().await;

    assert_eq!(secondary.call_count(), 1);
    assert!(h.buffer.is_drained());

    let snap = h.controller.metrics().snapshot();
    assert_eq!(snap.secondary_failures, 1);
    assert_eq!(snap.dropped, 1);
}

#[tokio::test]
async fn test_failing_chunk_does_not_starve_others() {
    let sink = MockSink::scripted("half-down", vec![Outcome::FailRetryable], Outcome::Succeed);
    let h = Harness::new(sink.clone(), None, fast_retry(), FlushConfig::default());

    // two chunks under distinct keys
    let mut record = Record::new();
    record.insert("msg".into(), Value::String("a".into()));
    h.buffer
        .write(
            Metadata::new(None, Some("a".into()), None),
            &[(1000, record.clone())],
        )
        .await
        .unwrap();
    h.buffer.flush_all();
    h.buffer
        .write(Metadata::new(None, Some("b".into()), None), &[(1000, record)])
        .await
        .unwrap();
    h.buffer.flush_all();

    // first chunk fails and backs off; the second still flushes this pass
    h.controller.tick().await;
    assert_eq!(sink.call_count(), 2);
    assert_eq!(h.buffer.queued_count(), 1);
    assert_eq!(h.controller.metrics().snapshot().successes, 1);
}

// =============================================================================
// Shutdown drain
// =============================================================================

#[tokio::test]
async fn test_drain_flushes_staged_chunks() {
    let sink = MockSink::ok("healthy");
    let h = Harness::new(sink.clone(), None, fast_retry(), FlushConfig::default());

    h.emit("late").await;
    assert_eq!(h.buffer.staged_count(), 1);

    h.controller.drain().await.unwrap();

    assert_eq!(sink.call_count(), 1);
    assert!(h.buffer.is_drained());
}

#[tokio::test(start_paused = true)]
async fn test_drain_timeout_reports_lost_chunks() {
    let sink = MockSink::always_retryable("down");
    let flush = FlushConfig {
        drain_grace_secs: 1,
        ..Default::default()
    };
    let h = Harness::new(sink.clone(), None, fast_retry(), flush);

    h.emit("stuck").await;

    let err = h.controller.drain().await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ShutdownTimeout { remaining: 1 }
    ));
    assert!(h.buffer.is_drained());
}

#[tokio::test(start_paused = true)]
async fn test_drain_timeout_hands_leftovers_to_secondary() {
    let sink = MockSink::always_retryable("down");
    let secondary = MockSink::ok("fallback");
    let flush = FlushConfig {
        drain_grace_secs: 1,
        ..Default::default()
    };
    let h = Harness::new(sink.clone(), Some(secondary.clone()), fast_retry(), flush);

    h.emit("rescued").await;

    h.controller.drain().await.unwrap();
    assert_eq!(secondary.call_count(), 1);
    assert!(h.buffer.is_drained());
    assert_eq!(h.controller.metrics().snapshot().secondary_writes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_drains_on_shutdown() {
    let sink = MockSink::ok("healthy");
    let h = Harness::new(sink.clone(), None, fast_retry(), FlushConfig::default());

    h.emit("in flight").await;

    let controller = Arc::clone(&h.controller);
    let handle = tokio::spawn(async move { controller.run().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(30), handle)
        .await
        .expect("run should stop after shutdown")
        .unwrap()
        .unwrap();

    assert_eq!(sink.call_count(), 1);
    assert!(h.buffer.is_drained());
}
