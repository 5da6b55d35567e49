//! Tests for the first-match router
//!
//! Covers insertion-order evaluation, OR pattern lists, the no-match case,
//! the catch-all idiom, and the match cache.

use crate::{DestinationId, Pattern, Router, RoutingError};

fn two_rule_router() -> Router {
    Router::builder()
        .parse_rule(&["app.error", "app.fatal.**"], DestinationId::new(0))
        .unwrap()
        .parse_rule(&["app.**"], DestinationId::new(1))
        .unwrap()
        .build()
}

#[test]
fn test_empty_router_routes_nothing() {
    let router = Router::builder().build();
    assert!(router.is_empty());
    assert_eq!(router.route("anything"), None);
}

#[test]
fn test_first_match_wins() {
    let router = two_rule_router();

    // both rules match app.error; insertion order decides
    assert_eq!(router.route("app.error"), Some(DestinationId::new(0)));
    assert_eq!(router.route("app.fatal.db"), Some(DestinationId::new(0)));
    assert_eq!(router.route("app.access"), Some(DestinationId::new(1)));
}

#[test]
fn test_or_within_rule() {
    let router = two_rule_router();

    // either pattern of the first rule selects destination 0
    assert_eq!(router.route("app.fatal.io"), Some(DestinationId::new(0)));
    assert_eq!(router.route("app.error"), Some(DestinationId::new(0)));
}

#[test]
fn test_no_match_returns_none() {
    let router = two_rule_router();
    assert_eq!(router.route("db.slow"), None);
    assert_eq!(router.route(""), None);
}

#[test]
fn test_catch_all_last() {
    let router = Router::builder()
        .parse_rule(&["app.error"], DestinationId::new(0))
        .unwrap()
        .parse_rule(&["**"], DestinationId::new(9))
        .unwrap()
        .build();

    assert_eq!(router.route("app.error"), Some(DestinationId::new(0)));
    assert_eq!(router.route("db.slow"), Some(DestinationId::new(9)));
    assert_eq!(router.route(""), Some(DestinationId::new(9)));
}

#[test]
fn test_cached_lookup_is_stable() {
    let router = two_rule_router();

    // first call populates the cache, later calls must agree
    let first = router.route("app.error");
    for _ in 0..100 {
        assert_eq!(router.route("app.error"), first);
    }
    let miss = router.route("unrouted.tag");
    assert_eq!(miss, None);
    assert_eq!(router.route("unrouted.tag"), None);
}

#[test]
fn test_many_distinct_tags_survive_cache_rollover() {
    let router = two_rule_router();

    // more distinct tags than the cache holds; results stay correct
    for i in 0..3000 {
        let tag = format!("app.worker{i}");
        assert_eq!(router.route(&tag), Some(DestinationId::new(1)));
    }
    assert_eq!(router.route("app.error"), Some(DestinationId::new(0)));
}

#[test]
fn test_empty_rule_rejected() {
    let err = Router::builder()
        .rule(Vec::new(), DestinationId::new(0))
        .unwrap_err();
    assert!(matches!(err, RoutingError::EmptyRule { .. }));
}

#[test]
fn test_invalid_pattern_surfaces_at_build() {
    let err = Router::builder()
        .parse_rule(&["a.{b"], DestinationId::new(0))
        .unwrap_err();
    assert!(matches!(err, RoutingError::InvalidPattern { .. }));
}

#[test]
fn test_entries_exposed_in_order() {
    let router = two_rule_router();
    assert_eq!(router.entry_count(), 2);
    assert_eq!(router.entries()[0].destination(), DestinationId::new(0));
    assert_eq!(router.entries()[1].destination(), DestinationId::new(1));
    assert_eq!(router.entries()[0].patterns().len(), 2);
}

#[test]
fn test_entry_matches() {
    let patterns = vec![
        Pattern::compile("a.b").unwrap(),
        Pattern::compile("c.**").unwrap(),
    ];
    let router = Router::builder()
        .rule(patterns, DestinationId::new(4))
        .unwrap()
        .build();

    let entry = &router.entries()[0];
    assert!(entry.matches("a.b"));
    assert!(entry.matches("c.d.e"));
    assert!(!entry.matches("a.c"));
}
