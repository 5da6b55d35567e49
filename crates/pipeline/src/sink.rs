//! The sink interface
//!
//! A sink delivers one closed chunk per call. Failure classification comes
//! from the sink itself: a [`SinkError`] is either retryable (transient
//! network trouble, remote backpressure) or permanent (rejected payload,
//! authentication failure). The flush controller never guesses; it retries
//! exactly what the sink says is worth retrying.

use async_trait::async_trait;
use thiserror::Error;

use relay_buffer::FlushChunk;

/// A sink write failure, classified by the sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// Transient failure; the chunk is worth retrying later
    #[error("retryable sink failure: {0}")]
    Retryable(String),

    /// The chunk will never succeed against this sink
    #[error("permanent sink failure: {0}")]
    Permanent(String),
}

impl SinkError {
    /// Wrap a transient failure
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable(message.into())
    }

    /// Wrap a non-retryable failure
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    /// Check whether the controller should schedule a retry
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// An output destination for closed chunks
///
/// Implementations receive the chunk payload as opaque encoded bytes plus
/// its record count and metadata. A write call owns the chunk exclusively
/// for its duration; the controller resolves the outcome afterward.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Human-readable name for logs and metrics
    fn name(&self) -> &str;

    /// Deliver one chunk
    async fn write(&self, chunk: &FlushChunk) -> Result<(), SinkError>;
}
