//! Destination identifier type
//!
//! `DestinationId` is a lightweight, Copy identifier for routing targets.
//! Routing works on ids; names only exist in configuration and logs.

use std::fmt;

/// Identifier for a routing destination
///
/// A small `Copy` handle assigned sequentially while the router is built.
/// The pipeline uses it to index into its destination table, so lookups
/// after routing are O(1) with no string operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(u16);

impl DestinationId {
    /// Create a new destination ID from a numeric index
    #[inline]
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get the numeric index of this destination
    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Get the index as usize (for array indexing)
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dest:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id = DestinationId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.as_usize(), 42);
    }

    #[test]
    fn test_copy_and_equality() {
        let id1 = DestinationId::new(5);
        let id2 = id1;
        assert_eq!(id1, id2);
        assert_ne!(id1, DestinationId::new(6));
    }

    #[test]
    fn test_display() {
        assert_eq!(DestinationId::new(3).to_string(), "dest:3");
    }

    #[test]
    fn test_array_indexing() {
        let names = ["file", "forward", "stdout"];
        let id = DestinationId::new(1);
        assert_eq!(names[id.as_usize()], "forward");
    }
}
