//! Chunk metadata - the buffer's chunk key
//!
//! Two events accumulate into the same chunk exactly when their derived
//! `Metadata` values are equal. Which dimensions participate is decided by
//! the destination's [`ChunkingConfig`](crate::ChunkingConfig): a discretized
//! time slot, the tag, and/or values extracted from the record.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::config::ChunkingConfig;
use crate::event::{EventTime, Record};

/// The chunk key
///
/// Equality across all three components defines chunk identity. Components
/// are `None` when the corresponding dimension is not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Metadata {
    /// Start of the event's time bucket, unix seconds
    timekey: Option<i64>,

    /// Event tag
    tag: Option<String>,

    /// Values extracted from the record, in key order
    variables: Option<BTreeMap<String, String>>,
}

impl Metadata {
    /// Derive the chunk key for an event under the given chunking config
    #[must_use]
    pub fn for_event(tag: &str, time: EventTime, record: &Record, config: &ChunkingConfig) -> Self {
        let timekey = config.timekey_secs.map(|interval| {
            let interval = interval.max(1) as i64;
            let offset = i64::from(config.timekey_utc_offset_secs);
            (time + offset).div_euclid(interval) * interval - offset
        });

        let tag = config.key_tag.then(|| tag.to_string());

        let variables = (!config.variable_keys.is_empty()).then(|| {
            config
                .variable_keys
                .iter()
                .filter_map(|key| {
                    record.get(key).map(|value| {
                        let rendered = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key.clone(), rendered)
                    })
                })
                .collect()
        });

        Self {
            timekey,
            tag,
            variables,
        }
    }

    /// Construct an explicit key (mostly for tests and secondary tooling)
    #[must_use]
    pub fn new(
        timekey: Option<i64>,
        tag: Option<String>,
        variables: Option<BTreeMap<String, String>>,
    ) -> Self {
        Self {
            timekey,
            tag,
            variables,
        }
    }

    /// Start of the time bucket, if time chunking is configured
    #[inline]
    pub fn timekey(&self) -> Option<i64> {
        self.timekey
    }

    /// Tag component, if tag chunking is configured
    #[inline]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Extracted variables, if variable chunking is configured
    #[inline]
    pub fn variables(&self) -> Option<&BTreeMap<String, String>> {
        self.variables.as_ref()
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timekey={} tag={}",
            self.timekey.map_or("-".to_string(), |t| t.to_string()),
            self.tag.as_deref().unwrap_or("-"),
        )?;
        if let Some(vars) = &self.variables {
            for (k, v) in vars {
                write!(f, " {k}={v}")?;
            }
        }
        Ok(())
    }
}
