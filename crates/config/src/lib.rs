//! Relay Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use relay_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "[destinations.stdout]\n[[routing.rules]]\npatterns = [\"**\"]\ndestination = \"stdout\"",
//! )
//! .unwrap();
//! assert!(config.routing.has_rules());
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [destinations.alerts]
//! [destinations.alerts.retry]
//! max_attempts = 5
//!
//! [destinations.archive]
//! secondary = "alerts"
//! [destinations.archive.chunking]
//! timekey_secs = 3600
//!
//! [[routing.rules]]
//! patterns = ["app.error", "app.fatal"]
//! destination = "alerts"
//!
//! [[routing.rules]]
//! patterns = ["**"]
//! destination = "archive"
//! ```

mod destination;
mod error;
mod routing;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use relay_routing::Pattern;

pub use destination::DestinationConfig;
pub use error::{ConfigError, Result};
pub use routing::{RoutingConfig, RuleConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Named destinations, each with its buffering and flush parameters
    pub destinations: BTreeMap<String, DestinationConfig>,

    /// Tag-routing rules
    pub routing: RoutingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks that:
    /// - at least one destination is defined
    /// - every rule has patterns and they all compile
    /// - every rule's destination is defined
    /// - every secondary refers to a different, defined destination
    ///
    /// All of these fail at config load, never at runtime.
    fn validate(&self) -> Result<()> {
        if self.destinations.is_empty() {
            return Err(ConfigError::NoDestinations);
        }

        for (index, rule) in self.routing.rules.iter().enumerate() {
            if rule.patterns.is_empty() {
                return Err(ConfigError::empty_rule(index, &rule.destination));
            }
            for pattern in &rule.patterns {
                Pattern::compile(pattern)
                    .map_err(|source| ConfigError::InvalidPattern { rule: index, source })?;
            }
            if !self.destinations.contains_key(&rule.destination) {
                return Err(ConfigError::unknown_destination(index, &rule.destination));
            }
        }

        for (name, destination) in &self.destinations {
            if let Some(secondary) = &destination.secondary {
                if secondary == name {
                    return Err(ConfigError::SelfSecondary {
                        destination: name.clone(),
                    });
                }
                if !self.destinations.contains_key(secondary) {
                    return Err(ConfigError::unknown_secondary(name, secondary));
                }
            }
        }

        Ok(())
    }

    /// Get destination names in definition order
    pub fn destination_names(&self) -> Vec<&str> {
        self.destinations.keys().map(String::as_str).collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = Config::from_str("[destinations.stdout]").unwrap();
        assert_eq!(config.destination_names(), vec!["stdout"]);
        assert!(!config.routing.has_rules());
    }

    #[test]
    fn test_empty_config_rejected() {
        let err = Config::from_str("").unwrap_err();
        assert!(matches!(err, ConfigError::NoDestinations));
    }

    #[test]
    fn test_full_config_parses() {
        let config = Config::from_str(
            r#"
            [destinations.alerts]
            [destinations.alerts.retry]
            max_attempts = 5

            [destinations.archive]
            secondary = "alerts"
            [destinations.archive.chunking]
            timekey_secs = 3600

            [[routing.rules]]
            patterns = ["app.error", "app.fatal"]
            destination = "alerts"

            [[routing.rules]]
            patterns = ["**"]
            destination = "archive"
            "#,
        )
        .unwrap();

        assert_eq!(config.destinations.len(), 2);
        assert_eq!(config.routing.rules.len(), 2);
        assert_eq!(
            config.destinations["archive"].secondary.as_deref(),
            Some("alerts")
        );
        assert_eq!(
            config.destinations["archive"].chunking.timekey_secs,
            Some(3600)
        );
    }

    #[test]
    fn test_unknown_destination_rejected() {
        let err = Config::from_str(
            r#"
            [destinations.real]

            [[routing.rules]]
            patterns = ["**"]
            destination = "imaginary"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDestination { .. }));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let err = Config::from_str(
            r#"
            [destinations.real]

            [[routing.rules]]
            patterns = ["a.{b,c"]
            destination = "real"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { rule: 0, .. }));
    }

    #[test]
    fn test_rule_without_patterns_rejected() {
        let err = Config::from_str(
            r#"
            [destinations.real]

            [[routing.rules]]
            patterns = []
            destination = "real"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRule { rule: 0, .. }));
    }

    #[test]
    fn test_unknown_secondary_rejected() {
        let err = Config::from_str(
            r#"
            [destinations.primary]
            secondary = "missing"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSecondary { .. }));
    }

    #[test]
    fn test_self_secondary_rejected() {
        let err = Config::from_str(
            r#"
            [destinations.loop]
            secondary = "loop"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SelfSecondary { .. }));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = Config::from_str("destinations = not toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
