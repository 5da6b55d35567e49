//! Routing error types

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur while compiling patterns or building a router
///
/// All of these are configuration-time errors. Once a `Router` is built,
/// routing itself cannot fail.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Malformed tag glob pattern
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern source
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Routing rule with an empty pattern list
    #[error("routing rule for destination {destination} has no patterns")]
    EmptyRule {
        /// Destination the rule points at
        destination: String,
    },
}

impl RoutingError {
    /// Create an InvalidPattern error
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create an EmptyRule error
    #[inline]
    pub fn empty_rule(destination: impl Into<String>) -> Self {
        Self::EmptyRule {
            destination: destination.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_display() {
        let err = RoutingError::invalid_pattern("a.{b", "unbalanced '{'");
        assert!(err.to_string().contains("a.{b"));
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn test_empty_rule_display() {
        let err = RoutingError::empty_rule("file");
        assert!(err.to_string().contains("file"));
        assert!(err.to_string().contains("no patterns"));
    }
}
