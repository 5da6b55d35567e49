//! Buffer configuration
//!
//! Capacity limits, overflow behavior, and the chunking dimensions that
//! derive a chunk key from an event. Values arrive pre-parsed (plain
//! integers, seconds and bytes); the `relay-config` crate handles the TOML
//! surface.

use serde::Deserialize;

/// What to do when the total buffer byte limit would be exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Fail the write with `BufferError::Overflow`
    #[default]
    Error,
    /// Suspend the writer until space frees (cancellable by shutdown)
    Block,
    /// Evict and purge the oldest queued chunk, then proceed
    DropOldest,
}

/// Buffer capacity limits and overflow behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Total byte limit across staged, queued, and flushing chunks
    pub max_total_bytes: usize,

    /// Byte limit for a single chunk; reaching it closes the chunk
    pub max_chunk_bytes: usize,

    /// Optional record-count limit for a single chunk
    pub max_chunk_records: Option<usize>,

    /// Maximum age of a staged chunk before it is closed, in seconds
    pub max_staged_secs: u64,

    /// Behavior when `max_total_bytes` would be exceeded
    pub overflow: OverflowPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: 64 * 1024 * 1024,
            max_chunk_bytes: 8 * 1024 * 1024,
            max_chunk_records: None,
            max_staged_secs: 60,
            overflow: OverflowPolicy::Error,
        }
    }
}

/// Which dimensions of an event become part of its chunk key
///
/// An empty config (all dimensions off) puts every event of a destination
/// into one rolling chunk stream.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Bucket events into fixed time slots of this many seconds
    pub timekey_secs: Option<u64>,

    /// Grace period after a time slot ends before its chunks close, in
    /// seconds. Allows late events to land in the right bucket.
    pub timekey_wait_secs: u64,

    /// UTC offset applied before truncating to a time slot, in seconds
    pub timekey_utc_offset_secs: i32,

    /// Key chunks by event tag
    pub key_tag: bool,

    /// Record keys whose values are extracted into the chunk key
    pub variable_keys: Vec<String>,
}

impl ChunkingConfig {
    /// Check whether any chunking dimension is enabled
    pub fn is_keyed(&self) -> bool {
        self.timekey_secs.is_some() || self.key_tag || !self.variable_keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BufferConfig::default();
        assert_eq!(config.max_chunk_bytes, 8 * 1024 * 1024);
        assert_eq!(config.overflow, OverflowPolicy::Error);
        assert!(config.max_chunk_records.is_none());

        let chunking = ChunkingConfig::default();
        assert!(!chunking.is_keyed());
    }

    #[test]
    fn test_overflow_policy_deserialize() {
        let config: BufferConfig =
            toml::from_str("overflow = \"drop_oldest\"").expect("should parse");
        assert_eq!(config.overflow, OverflowPolicy::DropOldest);
    }
}
