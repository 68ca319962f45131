//! Dependency linking between host and service feeds.
//!
//! A service feed depends on the status feeds of the host it runs on, and
//! on the `is_running` feeds of its own service. An `is_running` feed only
//! depends on the host.

use std::collections::{BTreeMap, HashSet};

use crate::data::{Feed, FeedKind};

use super::{ExposureMap, UnlinkedExposures};

/// Attach dependencies to every service feed and return the final map.
///
/// The input is not modified; linking the same input twice gives equal maps.
pub fn link(unlinked: &UnlinkedExposures) -> ExposureMap {
    let mut services = BTreeMap::new();

    for (service_id, feeds) in &unlinked.services {
        let host_chain: Vec<&str> = unlinked
            .host_feeds(&service_id.host_id())
            .iter()
            .filter(|feed| feed.kind == FeedKind::HostStatus)
            .flat_map(|feed| {
                feed.dependencies
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(feed.integration_id.as_str()))
            })
            .collect();

        let is_running: Vec<&str> = feeds
            .iter()
            .filter(|feed| feed.kind == FeedKind::ServiceIsRunning)
            .map(|feed| feed.integration_id.as_str())
            .collect();

        let linked: Vec<Feed> = feeds
            .iter()
            .map(|feed| {
                let mut ids = host_chain.clone();
                if feed.kind != FeedKind::ServiceIsRunning {
                    ids.extend(is_running.iter().copied());
                }
                Feed {
                    dependencies: dedup_preserving_order(ids),
                    ..feed.clone()
                }
            })
            .collect();

        services.insert(service_id.clone(), linked);
    }

    ExposureMap {
        hosts: unlinked.hosts.clone(),
        services,
    }
}

fn dedup_preserving_order(ids: Vec<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
