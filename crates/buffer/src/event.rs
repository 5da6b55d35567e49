//! Event types and chunk payload encoding
//!
//! An event is a unix timestamp plus a structured record. Inside a chunk the
//! events are stored as one JSON array line per event: `[time, record]`.
//! Everything downstream of the buffer treats the payload as opaque bytes
//! plus a record count.

use serde_json::{Map, Value};

use crate::error::Result;

/// Event timestamp, unix seconds
pub type EventTime = i64;

/// Structured event record
pub type Record = Map<String, Value>;

/// Append one serialized event to a payload buffer
pub(crate) fn encode_event(buf: &mut Vec<u8>, time: EventTime, record: &Record) -> Result<()> {
    serde_json::to_writer(&mut *buf, &(time, record))?;
    buf.push(b'\n');
    Ok(())
}

/// Serialize an event batch into a standalone payload fragment
///
/// Returns the encoded bytes; the caller appends them to a staged chunk as
/// one atomic unit.
pub(crate) fn encode_batch(events: &[(EventTime, Record)]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(events.len() * 64);
    for (time, record) in events {
        encode_event(&mut buf, *time, record)?;
    }
    Ok(buf)
}
