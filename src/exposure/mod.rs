//! Exposure rules and the feed map built from them.
//!
//! ## Submodules
//!
//! - [`rule`]: compiled exposure rules and feed templates
//! - [`matcher`]: regex match engine with named captures
//! - [`interpolate`]: `{{ field }}` and `{! VAR !}` templates
//! - [`tags`]: `_NMTAG_` custom variables to feed tags
//! - [`builder`]: rules plus objects to an [`UnlinkedExposures`]
//! - [`link`]: dependency linking into the final [`ExposureMap`]
//!
//! ## Build Flow
//!
//! ```text
//! ExposureRules ─┐
//!                ├──▶ build_exposures ──▶ UnlinkedExposures ──▶ link ──▶ ExposureMap
//! NagiosObjects ─┘       (match, interpolate, tag)                        (read-only)
//! ```

pub mod builder;
pub mod interpolate;
pub mod link;
pub mod matcher;
pub mod rule;
pub mod tags;

pub use builder::{build_exposures, host_fields, service_fields};
pub use interpolate::{interpolate, interpolate_env, interpolate_env_with, InterpolationFields};
pub use link::link;
pub use matcher::{matches, Captures, Matchable};
pub use rule::{ExposureRules, FeedTemplate, HostRule, MatchField, MatchRule, ServiceRule};
pub use tags::{extract_tags, merge_tags, TAG_PREFIX};

use std::collections::BTreeMap;

use crate::data::Feed;
use crate::error::DuplicateFeedError;
use crate::source::{HostId, NagiosObjects, ServiceId};

fn push_unique(
    feeds: &mut Vec<Feed>,
    entity: String,
    feed: Feed,
) -> Result<(), DuplicateFeedError> {
    if feeds.iter().any(|f| f.integration_id == feed.integration_id) {
        return Err(DuplicateFeedError {
            entity,
            integration_id: feed.integration_id,
        });
    }
    feeds.push(feed);
    Ok(())
}

/// Feeds per entity before dependencies are filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlinkedExposures {
    pub(crate) hosts: BTreeMap<HostId, Vec<Feed>>,
    pub(crate) services: BTreeMap<ServiceId, Vec<Feed>>,
}

impl UnlinkedExposures {
    /// Append a feed to a host. Fails if the host already has a feed with
    /// the same integration id.
    pub fn add_host_feed(&mut self, host: HostId, feed: Feed) -> Result<(), DuplicateFeedError> {
        let entity = format!("host '{host}'");
        push_unique(self.hosts.entry(host).or_default(), entity, feed)
    }

    /// Append a feed to a service. Fails if the service already has a feed
    /// with the same integration id.
    pub fn add_service_feed(
        &mut self,
        service: ServiceId,
        feed: Feed,
    ) -> Result<(), DuplicateFeedError> {
        let entity = format!("service '{service}'");
        push_unique(self.services.entry(service).or_default(), entity, feed)
    }

    pub fn host_feeds(&self, host: &HostId) -> &[Feed] {
        self.hosts.get(host).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn service_feeds(&self, service: &ServiceId) -> &[Feed] {
        self.services.get(service).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn feed_count(&self) -> usize {
        self.hosts.values().chain(self.services.values()).map(Vec::len).sum()
    }
}

/// Linked feeds per host and service, looked up by status records on
/// every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposureMap {
    pub(crate) hosts: BTreeMap<HostId, Vec<Feed>>,
    pub(crate) services: BTreeMap<ServiceId, Vec<Feed>>,
}

impl ExposureMap {
    /// Build, then link, in one step.
    pub fn build(
        rules: &ExposureRules,
        objects: &NagiosObjects,
    ) -> Result<Self, DuplicateFeedError> {
        Ok(link(&build_exposures(rules, objects)?))
    }

    pub fn host_feeds(&self, host: &HostId) -> &[Feed] {
        self.hosts.get(host).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn service_feeds(&self, service: &ServiceId) -> &[Feed] {
        self.services.get(service).map(Vec::as_slice).unwrap_or_default()
    }

    /// Hosts with at least one feed.
    pub fn hosts(&self) -> impl Iterator<Item = (&HostId, &[Feed])> {
        self.hosts.iter().map(|(id, feeds)| (id, feeds.as_slice()))
    }

    /// Services with at least one feed.
    pub fn services(&self) -> impl Iterator<Item = (&ServiceId, &[Feed])> {
        self.services.iter().map(|(id, feeds)| (id, feeds.as_slice()))
    }

    /// Every feed, hosts first.
    pub fn feeds(&self) -> impl Iterator<Item = &Feed> {
        self.hosts.values().chain(self.services.values()).flatten()
    }

    /// Whether any feed has this integration id.
    pub fn contains(&self, integration_id: &str) -> bool {
        self.feeds().any(|feed| feed.integration_id == integration_id)
    }

    pub fn feed_count(&self) -> usize {
        self.feeds().count()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CustomData, FeedKind};

    fn feed(kind: FeedKind, page_id: u64, entity: &str) -> Feed {
        Feed {
            kind,
            integration_id: kind.integration_id(page_id, 1, entity),
            api_key_name: "default".to_string(),
            name: entity.to_string(),
            description: String::new(),
            organisation_id: 1,
            page_id,
            space_id: 1,
            custom_data: CustomData::default(),
            dependencies: vec![],
        }
    }

    #[test]
    fn test_duplicate_host_feed() {
        let mut exposures = UnlinkedExposures::default();
        let host = HostId::new("web01");
        exposures
            .add_host_feed(host.clone(), feed(FeedKind::HostStatus, 1, "web01"))
            .unwrap();
        let err = exposures
            .add_host_feed(host.clone(), feed(FeedKind::HostStatus, 1, "web01"))
            .unwrap_err();
        assert_eq!(err.entity, "host 'web01'");
        assert_eq!(exposures.host_feeds(&host).len(), 1);
    }

    #[test]
    fn test_feeds_keep_insertion_order() {
        let mut exposures = UnlinkedExposures::default();
        let service = ServiceId::new("web01", "PING");
        exposures
            .add_service_feed(service.clone(), feed(FeedKind::ServicePing, 1, "PING@web01"))
            .unwrap();
        exposures
            .add_service_feed(service.clone(), feed(FeedKind::ServiceTransparent, 1, "PING@web01"))
            .unwrap();
        let kinds: Vec<_> = exposures.service_feeds(&service).iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FeedKind::ServicePing, FeedKind::ServiceTransparent]);
        assert_eq!(exposures.feed_count(), 2);
    }

    #[test]
    fn test_empty_map() {
        let map = ExposureMap::default();
        assert!(map.is_empty());
        assert_eq!(map.feed_count(), 0);
        assert!(map.host_feeds(&HostId::new("missing")).is_empty());
        assert!(!map.contains("host::page_1:space_1:status::missing"));
    }
}
