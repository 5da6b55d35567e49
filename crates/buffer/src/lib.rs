//! Relay - Buffer
//!
//! Durable accumulation of events into chunks, keyed by routing-derived
//! [`Metadata`], with capacity enforcement and the staged → queued →
//! flushing lifecycle.
//!
//! # Architecture
//!
//! ```text
//! write(metadata, events)          enqueue_expired / limits
//!        │                                  │
//!        ▼                                  ▼
//!   [staged chunk per key] ───────► [queued, oldest first] ───► dequeue_ready
//!                                          ▲                        │
//!                                 requeue (retry)              [flushing]
//!                                          └──────── ack / purge ───┘
//! ```
//!
//! The buffer is destination-scoped: the pipeline creates one per
//! destination, so a slow sink only ever backs up its own buffer.

mod buffer;
mod chunk;
mod clock;
mod config;
mod error;
mod event;
mod metadata;
mod metrics;


pub use buffer::Buffer;
pub use chunk::{Chunk, ChunkId, ChunkState, FlushChunk, RetryState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BufferConfig, ChunkingConfig, OverflowPolicy};
pub use error::{BufferError, Result};
pub use event::{EventTime, Record};
pub use metadata::Metadata;
pub use metrics::{BufferMetrics, BufferMetricsSnapshot};
