//! Relay - Routing
//!
//! Tag glob patterns and the ordered first-match router.
//!
//! # Design
//!
//! Patterns and rules are compiled once at config load; the `Router` is
//! immutable afterwards and matching is pure. The hot path is a cached
//! tag lookup; cold lookups walk the rules in insertion order and return
//! the first match.
//!
//! # Example
//!
//! ```
//! use relay_routing::{DestinationId, Pattern, Router};
//!
//! let errors = DestinationId::new(0);
//! let catch_all = DestinationId::new(1);
//!
//! let router = Router::builder()
//!     .parse_rule(&["*.error", "app.{fatal,panic}.**"], errors)
//!     .unwrap()
//!     .parse_rule(&["**"], catch_all)
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(router.route("web.error"), Some(errors));
//! assert_eq!(router.route("app.fatal.db"), Some(errors));
//! assert_eq!(router.route("metrics.cpu"), Some(catch_all));
//!
//! assert!(Pattern::compile("a.{b").is_err());
//! ```

mod destination;
mod error;
mod pattern;
mod router;

#[cfg(test)]
mod router_test;

pub use destination::DestinationId;
pub use error::{Result, RoutingError};
pub use pattern::{Pattern, TAG_DELIMITER};
pub use router::{RouteEntry, Router, RouterBuilder};
