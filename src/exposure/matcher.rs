//! Match engine.
//!
//! A rule matches a record when at least one of its patterns is found in the
//! corresponding record field. Named groups from every matching pattern are
//! collected; when two patterns capture the same name the later pattern, in
//! [`MatchField`] order, wins.

use std::collections::BTreeMap;

use crate::source::{HostRecord, ServiceRecord};

use super::rule::{MatchField, MatchRule};

/// Named capture groups collected from a match.
pub type Captures = BTreeMap<String, String>;

/// A record that patterns can be matched against.
pub trait Matchable {
    /// The value of `field`, if the record has it.
    fn match_field(&self, field: MatchField) -> Option<&str>;
}

impl Matchable for HostRecord {
    fn match_field(&self, field: MatchField) -> Option<&str> {
        match field {
            MatchField::HostName => Some(self.host_name.as_str()),
            MatchField::Address => self.address.as_deref(),
            MatchField::CheckCommand => self.check_command.as_deref(),
            MatchField::ServiceDescription => None,
        }
    }
}

impl Matchable for ServiceRecord {
    fn match_field(&self, field: MatchField) -> Option<&str> {
        match field {
            MatchField::HostName => Some(self.host_name.as_str()),
            MatchField::ServiceDescription => Some(self.service_description.as_str()),
            MatchField::CheckCommand => self.check_command.as_deref(),
            MatchField::Address => None,
        }
    }
}

/// Match a record against a rule.
///
/// Returns `None` when the rule does not match, otherwise the captures.
pub fn matches<M: Matchable + ?Sized>(record: &M, rule: &MatchRule) -> Option<Captures> {
    let mut matched = false;
    let mut captures = Captures::new();

    for (field, pattern) in rule.patterns() {
        let Some(value) = record.match_field(*field) else {
            continue;
        };
        let Some(found) = pattern.captures(value) else {
            continue;
        };

        matched = true;
        for name in pattern.capture_names().flatten() {
            if let Some(group) = found.name(name) {
                captures.insert(name.to_string(), group.as_str().to_string());
            }
        }
    }

    matched.then_some(captures)
}
