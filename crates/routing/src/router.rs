//! First-match tag routing
//!
//! The router holds an ordered list of rules compiled once at config load.
//! Each rule pairs a set of patterns (logical OR) with one destination.
//! A tag is dispatched to the first rule with a matching pattern; rules are
//! never reordered at runtime.
//!
//! Routing results are memoized in a bounded per-router cache since the same
//! tags repeat heavily in practice. The cache is cleared wholesale when full.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::destination::DestinationId;
use crate::error::{Result, RoutingError};
use crate::pattern::Pattern;

/// Maximum number of memoized tag lookups per router
const MATCH_CACHE_SIZE: usize = 1024;

/// One routing rule: any of `patterns` sends the tag to `destination`
#[derive(Debug, Clone)]
pub struct RouteEntry {
    patterns: Vec<Pattern>,
    destination: DestinationId,
}

impl RouteEntry {
    /// The rule's patterns
    #[inline]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The rule's destination
    #[inline]
    pub fn destination(&self) -> DestinationId {
        self.destination
    }

    /// Check whether any of the rule's patterns matches the tag
    #[inline]
    pub fn matches(&self, tag: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(tag))
    }
}

/// Ordered first-match router
///
/// # Example
///
/// ```
/// use relay_routing::{DestinationId, Router};
///
/// let router = Router::builder()
///     .parse_rule(&["app.error", "app.warn.**"], DestinationId::new(0))
///     .unwrap()
///     .parse_rule(&["**"], DestinationId::new(1))
///     .unwrap()
///     .build();
///
/// assert_eq!(router.route("app.error"), Some(DestinationId::new(0)));
/// assert_eq!(router.route("db.slow"), Some(DestinationId::new(1)));
/// ```
#[derive(Debug)]
pub struct Router {
    /// Rules in insertion order; first match wins
    entries: Vec<RouteEntry>,

    /// Memoized tag → destination lookups (misses are cached too)
    cache: Mutex<HashMap<String, Option<DestinationId>>>,
}

impl Router {
    /// Start building a router
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Route a tag to its destination
    ///
    /// Evaluates rules in insertion order and returns the first rule whose
    /// pattern list contains a match, or `None` if nothing matches. The
    /// caller decides the fallback for unmatched tags.
    pub fn route(&self, tag: &str) -> Option<DestinationId> {
        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.get(tag) {
                return *cached;
            }
        }

        let resolved = self.lookup(tag);

        let mut cache = self.cache.lock();
        if cache.len() >= MATCH_CACHE_SIZE {
            cache.clear();
        }
        cache.insert(tag.to_string(), resolved);

        resolved
    }

    /// Uncached first-match scan
    fn lookup(&self, tag: &str) -> Option<DestinationId> {
        self.entries
            .iter()
            .find(|entry| entry.matches(tag))
            .map(RouteEntry::destination)
    }

    /// Get the rules in evaluation order
    #[inline]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Get the number of rules
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Check if no rules are configured
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for constructing routers from configuration
#[derive(Debug, Default)]
pub struct RouterBuilder {
    entries: Vec<RouteEntry>,
}

impl RouterBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule from already-compiled patterns
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::EmptyRule`] if `patterns` is empty.
    pub fn rule(
        mut self,
        patterns: Vec<Pattern>,
        destination: DestinationId,
    ) -> Result<Self> {
        if patterns.is_empty() {
            return Err(RoutingError::empty_rule(destination.to_string()));
        }
        self.entries.push(RouteEntry {
            patterns,
            destination,
        });
        Ok(self)
    }

    /// Add a rule, compiling its patterns from source strings
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidPattern`] for a malformed pattern, or
    /// [`RoutingError::EmptyRule`] if `patterns` is empty.
    pub fn parse_rule(self, patterns: &[&str], destination: DestinationId) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|source| Pattern::compile(source))
            .collect::<Result<Vec<_>>>()?;
        self.rule(compiled, destination)
    }

    /// Build the router
    #[must_use]
    pub fn build(self) -> Router {
        Router {
            entries: self.entries,
            cache: Mutex::new(HashMap::new()),
        }
    }
}
