//! Configuration error types

use std::io;

use thiserror::Error;

use relay_routing::RoutingError;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A routing rule references a destination that is not defined
    #[error("routing rule {rule} references unknown destination '{destination}'")]
    UnknownDestination {
        /// Zero-based rule index
        rule: usize,
        /// Name of the missing destination
        destination: String,
    },

    /// A destination's secondary references a destination that is not defined
    #[error("destination '{destination}' has unknown secondary '{secondary}'")]
    UnknownSecondary {
        /// Name of the destination
        destination: String,
        /// Name of the missing secondary
        secondary: String,
    },

    /// A destination names itself as its own secondary
    #[error("destination '{destination}' is its own secondary")]
    SelfSecondary {
        /// Name of the destination
        destination: String,
    },

    /// A routing rule has no patterns
    #[error("routing rule {rule} for '{destination}' has no patterns")]
    EmptyRule {
        /// Zero-based rule index
        rule: usize,
        /// The rule's target destination
        destination: String,
    },

    /// A routing pattern failed to compile
    #[error("routing rule {rule}: {source}")]
    InvalidPattern {
        /// Zero-based rule index
        rule: usize,
        /// The compile failure
        #[source]
        source: RoutingError,
    },

    /// No destinations defined
    #[error("no destinations are defined - at least one destination is required")]
    NoDestinations,
}

impl ConfigError {
    /// Create an UnknownDestination error
    pub fn unknown_destination(rule: usize, destination: impl Into<String>) -> Self {
        Self::UnknownDestination {
            rule,
            destination: destination.into(),
        }
    }

    /// Create an UnknownSecondary error
    pub fn unknown_secondary(
        destination: impl Into<String>,
        secondary: impl Into<String>,
    ) -> Self {
        Self::UnknownSecondary {
            destination: destination.into(),
            secondary: secondary.into(),
        }
    }

    /// Create an EmptyRule error
    pub fn empty_rule(rule: usize, destination: impl Into<String>) -> Self {
        Self::EmptyRule {
            rule,
            destination: destination.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_destination_error() {
        let err = ConfigError::unknown_destination(2, "s3");
        assert!(err.to_string().contains("rule 2"));
        assert!(err.to_string().contains("'s3'"));
    }

    #[test]
    fn test_unknown_secondary_error() {
        let err = ConfigError::unknown_secondary("primary", "fallback");
        assert!(err.to_string().contains("primary"));
        assert!(err.to_string().contains("fallback"));
    }

    #[test]
    fn test_empty_rule_error() {
        let err = ConfigError::empty_rule(0, "archive");
        assert!(err.to_string().contains("rule 0"));
        assert!(err.to_string().contains("archive"));
    }
}
