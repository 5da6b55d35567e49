//! Chunks - the unit of buffered, batched event data
//!
//! A chunk accumulates serialized events while `Staged`, freezes its payload
//! when it becomes `Queued`, and is checked out as `Flushing` by exactly one
//! flush attempt at a time. Transitions only move forward through the state
//! machine; the one backward edge, `Flushing` back to `Queued`, is the retry
//! path after a failed flush.

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{BufferError, Result};
use crate::metadata::Metadata;

/// Unique chunk identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(Uuid);

impl ChunkId {
    /// Generate a fresh id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Chunk lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Accepting appends
    Staged,
    /// Closed, immutable, awaiting flush
    Queued,
    /// Checked out by one in-flight flush attempt
    Flushing,
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Staged => "staged",
            Self::Queued => "queued",
            Self::Flushing => "flushing",
        };
        f.write_str(s)
    }
}

/// Retry bookkeeping attached to a chunk after its first failed flush
///
/// Discarded on success or when the chunk is permanently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Failed attempts so far
    pub attempts: u32,
    /// Unix time of the first failure
    pub started_at: i64,
    /// The chunk may not be dispatched again before this unix time
    pub not_before: i64,
}

/// One buffered chunk
pub struct Chunk {
    id: ChunkId,
    metadata: Metadata,
    state: ChunkState,

    /// Mutable payload while staged
    staging: Vec<u8>,
    /// Frozen payload once queued
    payload: Bytes,

    records: usize,
    created_at: i64,
    modified_at: i64,
}

impl Chunk {
    /// Create an empty staged chunk
    #[must_use]
    pub fn new(metadata: Metadata, now: i64) -> Self {
        Self {
            id: ChunkId::generate(),
            metadata,
            state: ChunkState::Staged,
            staging: Vec::new(),
            payload: Bytes::new(),
            records: 0,
            created_at: now,
            modified_at: now,
        }
    }

    /// Chunk id
    #[inline]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// Chunk key
    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Check whether the chunk still accepts appends
    #[inline]
    pub fn is_staged(&self) -> bool {
        self.state == ChunkState::Staged
    }

    /// Payload size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        match self.state {
            ChunkState::Staged => self.staging.len(),
            _ => self.payload.len(),
        }
    }

    /// Number of buffered records
    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Unix time of the first write
    #[inline]
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Seconds since the chunk was created
    #[inline]
    pub fn age(&self, now: i64) -> i64 {
        now - self.created_at
    }

    /// Append an already-serialized event batch
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidState`] unless the chunk is `Staged`.
    pub fn append(&mut self, encoded: &[u8], records: usize, now: i64) -> Result<()> {
        if self.state != ChunkState::Staged {
            return Err(BufferError::InvalidState {
                id: self.id,
                from: self.state,
                to: ChunkState::Staged,
            });
        }
        self.staging.extend_from_slice(encoded);
        self.records += records;
        self.modified_at = now;
        Ok(())
    }

    /// Close the chunk: `Staged` → `Queued`, freezing the payload
    pub fn enqueue(&mut self) -> Result<()> {
        if self.state != ChunkState::Staged {
            return Err(self.bad_transition(ChunkState::Queued));
        }
        self.payload = Bytes::from(std::mem::take(&mut self.staging));
        self.state = ChunkState::Queued;
        Ok(())
    }

    /// Check the chunk out for a flush attempt: `Queued` → `Flushing`
    pub fn checkout(&mut self) -> Result<()> {
        if self.state != ChunkState::Queued {
            return Err(self.bad_transition(ChunkState::Flushing));
        }
        self.state = ChunkState::Flushing;
        Ok(())
    }

    /// Return the chunk after a failed attempt: `Flushing` → `Queued`
    pub fn release(&mut self) -> Result<()> {
        if self.state != ChunkState::Flushing {
            return Err(self.bad_transition(ChunkState::Queued));
        }
        self.state = ChunkState::Queued;
        Ok(())
    }

    /// Frozen payload (empty until the chunk is queued)
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Cheap immutable view handed to flush attempts and sinks
    #[must_use]
    pub fn flush_view(&self) -> FlushChunk {
        FlushChunk {
            id: self.id,
            metadata: self.metadata.clone(),
            payload: self.payload.clone(),
            records: self.records,
        }
    }

    fn bad_transition(&self, to: ChunkState) -> BufferError {
        BufferError::InvalidState {
            id: self.id,
            from: self.state,
            to,
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("records", &self.records)
            .field("size", &self.size())
            .finish()
    }
}

/// Immutable chunk view for sinks
///
/// The payload is a reference-counted [`Bytes`], so cloning the view is
/// cheap and never copies event data.
#[derive(Debug, Clone)]
pub struct FlushChunk {
    /// Chunk id, used to ack/requeue after the attempt resolves
    pub id: ChunkId,
    /// Chunk key
    pub metadata: Metadata,
    /// Frozen payload
    pub payload: Bytes,
    /// Record count
    pub records: usize,
}
