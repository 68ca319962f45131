//! Compiled exposure rules.
//!
//! Rules come from the `exposures` section of the configuration. Patterns
//! are compiled when the configuration is loaded, so a rule that exists is a
//! rule that can be evaluated.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

/// A record field a pattern can be matched against.
///
/// The declaration order is the order patterns are evaluated in, which
/// decides which capture wins when two patterns capture the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchField {
    HostName,
    ServiceDescription,
    Address,
    CheckCommand,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::HostName => "host_name",
            MatchField::ServiceDescription => "service_description",
            MatchField::Address => "address",
            MatchField::CheckCommand => "check_command",
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of optional patterns, at most one per field.
#[derive(Debug, Clone, Default)]
pub struct MatchRule {
    patterns: Vec<(MatchField, Regex)>,
}

impl MatchRule {
    pub fn new(patterns: impl IntoIterator<Item = (MatchField, Regex)>) -> Self {
        let mut patterns: Vec<_> = patterns.into_iter().collect();
        patterns.sort_by_key(|(field, _)| *field);
        patterns.dedup_by_key(|(field, _)| *field);
        Self { patterns }
    }

    /// Patterns in evaluation order.
    pub fn patterns(&self) -> &[(MatchField, Regex)] {
        &self.patterns
    }

    /// A rule without patterns matches nothing.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// How one feed is built for every matching entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTemplate {
    pub api_key: String,
    pub organisation_id: u64,
    pub page_id: u64,
    pub space_id: u64,
    /// Name template, interpolated per entity.
    pub name: String,
    /// Description template, interpolated per entity.
    pub description: String,
    /// Tag name to value template.
    pub tags: BTreeMap<String, String>,
}

/// Exposes matching services as up to three feeds.
#[derive(Debug, Clone)]
pub struct ServiceRule {
    /// Where the rule came from, used in logs and errors.
    pub label: String,
    pub matcher: MatchRule,
    pub transparent: Option<FeedTemplate>,
    pub is_running: Option<FeedTemplate>,
    pub ping: Option<FeedTemplate>,
}

/// Exposes matching hosts as a status feed.
#[derive(Debug, Clone)]
pub struct HostRule {
    pub label: String,
    pub matcher: MatchRule,
    pub status: Option<FeedTemplate>,
}

/// All exposure rules, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct ExposureRules {
    pub hosts: Vec<HostRule>,
    pub services: Vec<ServiceRule>,
}
