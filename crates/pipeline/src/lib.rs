//! Relay - Pipeline
//!
//! Flush orchestration and the event-facing surface that ties routing to
//! buffering.
//!
//! # Architecture
//!
//! ```text
//! [Producers]                [Pipeline]                      [Sinks]
//!    emit ───→ Router ──→ Buffer (per destination) ──→ FlushController ──→ Sink
//!                              staged → queued              retry/backoff  └─→ secondary
//! ```
//!
//! # Key Design
//!
//! - **First-match routing**: the tag picks exactly one destination
//! - **Per-destination buffers**: chunk keys derive from each destination's
//!   chunking config, so destinations never contend
//! - **Bounded flush concurrency**: a semaphore caps in-flight attempts;
//!   retry waits never hold a slot
//! - **Sink-classified failures**: sinks declare retryable vs. permanent,
//!   the controller schedules backoff or the secondary handoff accordingly
//! - **Injected clock**: retry deadlines and chunk expiry are testable
//!   without walls of sleeps
//!
//! # Example
//!
//! ```ignore
//! use relay_pipeline::{DestinationSpec, Pipeline};
//!
//! let pipeline = Pipeline::builder()
//!     .destination(DestinationSpec::new("archive", archive_sink))
//!     .destination(DestinationSpec::new("alerts", alert_sink))
//!     .route(&["app.error", "app.fatal"], "alerts")
//!     .route(&["app.**"], "archive")
//!     .build()?;
//!
//! pipeline.emit("app.error", now, record).await?;
//! tokio::spawn(async move { pipeline.run().await });
//! ```

mod controller;
mod error;
mod metrics;
mod pipeline;
mod retry;
mod sink;

pub use controller::{FlushConfig, FlushController};
pub use error::{PipelineError, Result};
pub use metrics::{FlushMetrics, FlushMetricsSnapshot, PipelineMetrics};
pub use pipeline::{DestinationSpec, Pipeline, PipelineBuilder};
pub use retry::RetryConfig;
pub use sink::{Sink, SinkError};

// Re-export key types from dependencies for convenience
pub use relay_buffer::{
    Buffer, BufferConfig, BufferError, ChunkingConfig, Clock, EventTime, FlushChunk, ManualClock,
    Metadata, OverflowPolicy, Record, RetryState, SystemClock,
};
pub use relay_routing::{DestinationId, Pattern, Router, RoutingError};
