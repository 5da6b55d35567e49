//! Routing configuration
//!
//! Tag-pattern rules evaluated in order; the first rule with a matching
//! pattern wins. Tags matching no rule are dropped (and reported by the
//! pipeline).
//!
//! # Example
//!
//! ```toml
//! [[routing.rules]]
//! patterns = ["app.error", "app.fatal"]
//! destination = "alerts"
//!
//! [[routing.rules]]
//! patterns = ["app.**"]
//! destination = "archive"
//! ```

use serde::Deserialize;

/// Ordered tag-routing rules
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Rules evaluated in order, first match wins
    pub rules: Vec<RuleConfig>,
}

/// One routing rule: any matching pattern sends the tag to `destination`
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Tag patterns (`a.b`, `a.*`, `a.**`, `a.{b,c}`, `a*`)
    pub patterns: Vec<String>,

    /// Name of the destination receiving matched tags
    pub destination: String,
}

impl RoutingConfig {
    /// Check if any routing rules are configured
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Get all destination names referenced by rules (for validation)
    pub fn referenced_destinations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !names.contains(&rule.destination.as_str()) {
                names.push(rule.destination.as_str());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_keep_declaration_order() {
        let config: RoutingConfig = toml::from_str(
            r#"
            [[rules]]
            patterns = ["app.error"]
            destination = "alerts"

            [[rules]]
            patterns = ["app.**", "db.**"]
            destination = "archive"
            "#,
        )
        .unwrap();

        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].destination, "alerts");
        assert_eq!(config.rules[1].patterns.len(), 2);
    }

    #[test]
    fn test_referenced_destinations_dedup() {
        let config: RoutingConfig = toml::from_str(
            r#"
            [[rules]]
            patterns = ["a.**"]
            destination = "archive"

            [[rules]]
            patterns = ["b.**"]
            destination = "archive"
            "#,
        )
        .unwrap();

        assert_eq!(config.referenced_destinations(), vec!["archive"]);
    }
}
