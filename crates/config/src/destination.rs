//! Destination configuration
//!
//! Each named destination bundles the buffering, chunking, flush, and
//! retry parameters consumed by the pipeline at construction. All values
//! arrive as plain integers (bytes, seconds) with the core crates'
//! defaults; only specify what you need to change.
//!
//! # Example
//!
//! ```toml
//! [destinations.archive]
//! secondary = "local_spool"
//!
//! [destinations.archive.buffer]
//! max_total_bytes = 134217728
//! overflow = "block"
//!
//! [destinations.archive.chunking]
//! timekey_secs = 3600
//! timekey_wait_secs = 60
//!
//! [destinations.archive.retry]
//! max_attempts = 20
//! max_delay_secs = 300
//! ```

use serde::Deserialize;

use relay_buffer::{BufferConfig, ChunkingConfig};
use relay_pipeline::{FlushConfig, RetryConfig};

/// Everything configurable about one destination
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Name of the destination whose sink takes chunks on permanent
    /// failure; must refer to another defined destination
    pub secondary: Option<String>,

    /// Capacity limits and overflow policy
    pub buffer: BufferConfig,

    /// Chunk key dimensions
    pub chunking: ChunkingConfig,

    /// Flush scheduling
    pub flush: FlushConfig,

    /// Retry budget and backoff
    pub retry: RetryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    use relay_buffer::OverflowPolicy;

    #[test]
    fn test_empty_section_uses_defaults() {
        let config: DestinationConfig = toml::from_str("").unwrap();
        assert!(config.secondary.is_none());
        assert_eq!(config.buffer.overflow, OverflowPolicy::Error);
        assert_eq!(config.flush.interval_secs, 1);
    }

    #[test]
    fn test_nested_sections_parse() {
        let config: DestinationConfig = toml::from_str(
            r#"
            secondary = "spool"

            [buffer]
            max_chunk_bytes = 1048576
            overflow = "drop_oldest"

            [chunking]
            timekey_secs = 60
            key_tag = true

            [retry]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.secondary.as_deref(), Some("spool"));
        assert_eq!(config.buffer.max_chunk_bytes, 1048576);
        assert_eq!(config.buffer.overflow, OverflowPolicy::DropOldest);
        assert_eq!(config.chunking.timekey_secs, Some(60));
        assert!(config.chunking.key_tag);
        assert_eq!(config.retry.max_attempts, Some(3));
    }
}
