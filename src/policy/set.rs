//! Route-scoped policy sets and the table that holds them.
//!
//! # Design Decisions
//! - A table is built once and never mutated; share it via `Arc`
//! - Every set whose matcher accepts a path contributes its rules
//! - On a repeated header the later set wins but keeps the position of
//!   the first assignment, so output order is stable

use serde::Serialize;

use crate::policy::matcher::RouteMatcher;
use crate::policy::rule::HeaderRule;

/// Ordered header rules applied to the paths a matcher accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySet {
    #[serde(rename = "source")]
    matcher: RouteMatcher,
    #[serde(rename = "headers")]
    rules: Vec<HeaderRule>,
}

impl PolicySet {
    pub fn new(matcher: RouteMatcher, rules: Vec<HeaderRule>) -> Self {
        Self { matcher, rules }
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn rules(&self) -> &[HeaderRule] {
        &self.rules
    }

    pub fn applies_to(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// All policy sets known to the gateway, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PolicyTable {
    sets: Vec<PolicySet>,
}

impl PolicyTable {
    pub fn new(sets: Vec<PolicySet>) -> Self {
        Self { sets }
    }

    /// The `(matcher, rules)` entries handed to the response pipeline.
    pub fn entries(&self) -> &[PolicySet] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Merged rules for a request path.
    pub fn headers_for(&self, path: &str) -> Vec<&HeaderRule> {
        let mut merged: Vec<&HeaderRule> = Vec::new();

        for set in self.sets.iter().filter(|s| s.applies_to(path)) {
            for rule in &set.rules {
                match merged.iter_mut().find(|r| r.name() == rule.name()) {
                    Some(slot) => *slot = rule,
                    None => merged.push(rule),
                }
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::rule::KnownHeader;

    fn rule(name: KnownHeader, value: &str) -> HeaderRule {
        HeaderRule::new(name, value).unwrap()
    }

    #[test]
    fn test_later_set_overrides_in_place() {
        let table = PolicyTable::new(vec![
            PolicySet::new(
                RouteMatcher::all(),
                vec![
                    rule(KnownHeader::XFrameOptions, "DENY"),
                    rule(KnownHeader::XContentTypeOptions, "nosniff"),
                ],
            ),
            PolicySet::new(
                RouteMatcher::parse("/embed/**").unwrap(),
                vec![
                    rule(KnownHeader::CrossOriginResourcePolicy, "cross-origin"),
                    rule(KnownHeader::XFrameOptions, "SAMEORIGIN"),
                ],
            ),
        ]);

        let embed: Vec<String> = table
            .headers_for("/embed/player")
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(
            embed,
            [
                "X-Frame-Options: SAMEORIGIN",
                "X-Content-Type-Options: nosniff",
                "Cross-Origin-Resource-Policy: cross-origin",
            ]
        );

        let root: Vec<String> = table.headers_for("/").iter().map(|r| r.to_string()).collect();
        assert_eq!(root, ["X-Frame-Options: DENY", "X-Content-Type-Options: nosniff"]);
    }

    #[test]
    fn test_no_matching_set() {
        let table = PolicyTable::new(vec![PolicySet::new(
            RouteMatcher::parse("/api/**").unwrap(),
            vec![rule(KnownHeader::XFrameOptions, "DENY")],
        )]);
        assert!(table.headers_for("/login").is_empty());
        assert!(PolicyTable::default().headers_for("/").is_empty());
    }

    #[test]
    fn test_serializes_like_framework_config() {
        let table = PolicyTable::new(vec![PolicySet::new(
            RouteMatcher::all(),
            vec![rule(KnownHeader::XFrameOptions, "DENY")],
        )]);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "source": "/**", "headers": [{ "key": "X-Frame-Options", "value": "DENY" }] }
            ])
        );
    }
}
