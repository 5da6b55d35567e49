//! Buffer error types

use thiserror::Error;

use crate::chunk::{ChunkId, ChunkState};

/// Result type for buffer operations
pub type Result<T> = std::result::Result<T, BufferError>;

/// Errors surfaced by the buffer
#[derive(Debug, Error)]
pub enum BufferError {
    /// Total buffer capacity exceeded under the `error` overflow policy
    #[error("buffer overflow: write of {needed} bytes exceeds total limit of {limit} bytes")]
    Overflow {
        /// Bytes the write needed
        needed: usize,
        /// Configured total byte limit
        limit: usize,
    },

    /// A single event batch is larger than one chunk may ever hold
    #[error("event batch of {size} bytes exceeds chunk limit of {limit} bytes")]
    BatchTooLarge {
        /// Serialized batch size
        size: usize,
        /// Configured per-chunk byte limit
        limit: usize,
    },

    /// Illegal chunk state transition
    #[error("chunk {id}: illegal transition from {from} to {to}")]
    InvalidState {
        /// Chunk involved
        id: ChunkId,
        /// State the chunk was in
        from: ChunkState,
        /// State the caller asked for
        to: ChunkState,
    },

    /// Chunk id not present in the flushing set
    #[error("unknown chunk {0}")]
    UnknownChunk(ChunkId),

    /// A blocked write was cancelled by shutdown
    #[error("buffer is shutting down")]
    ShuttingDown,

    /// Event serialization failed
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_display() {
        let err = BufferError::Overflow {
            needed: 128,
            limit: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn test_invalid_state_display() {
        let err = BufferError::InvalidState {
            id: ChunkId::generate(),
            from: ChunkState::Queued,
            to: ChunkState::Staged,
        };
        assert!(err.to_string().contains("illegal transition"));
    }
}
