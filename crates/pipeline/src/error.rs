//! Pipeline error types

use thiserror::Error;

use relay_buffer::BufferError;
use relay_routing::RoutingError;

/// Errors surfaced by pipeline construction, emission, and drain
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A route refers to a destination name that was never registered
    #[error("route refers to unknown destination: {0}")]
    UnknownDestination(String),

    /// A destination name was registered twice
    #[error("duplicate destination: {0}")]
    DuplicateDestination(String),

    /// The builder produced a pipeline with nothing to flush to
    #[error("pipeline has no destinations")]
    NoDestinations,

    /// Pattern compilation or rule validation failed
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Buffer rejected a producer write
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Drain grace period elapsed with chunks still unflushed
    #[error("shutdown drain incomplete: {remaining} chunks not flushed")]
    ShutdownTimeout { remaining: usize },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::UnknownDestination("s3".into());
        assert!(err.to_string().contains("s3"));

        let err = PipelineError::ShutdownTimeout { remaining: 4 };
        assert!(err.to_string().contains("4 chunks"));
    }

    #[test]
    fn test_buffer_error_converts() {
        let err = PipelineError::from(BufferError::ShuttingDown);
        assert!(matches!(err, PipelineError::Buffer(_)));
    }
}
