//! Feed definitions and per-tick results.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use dashboard_api::{Color, UpsertFeed};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::source::FieldValue;

/// Tag name to value. Multi-valued custom variables keep all their values.
pub type Tags = BTreeMap<String, FieldValue>;

/// The kind of status a feed reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Host reachability.
    HostStatus,
    /// Service state passed through as-is.
    ServiceTransparent,
    /// Whether the service is running, judged from its plugin output.
    ServiceIsRunning,
    /// Service state of a ping check.
    ServicePing,
}

impl FeedKind {
    /// `host` or `service`.
    pub fn entity_kind(&self) -> &'static str {
        match self {
            FeedKind::HostStatus => "host",
            _ => "service",
        }
    }

    /// The feed kind segment of the integration id.
    pub fn id_segment(&self) -> &'static str {
        match self {
            FeedKind::HostStatus => "status",
            FeedKind::ServiceTransparent => "transparent",
            FeedKind::ServiceIsRunning => "diagnostic:is_running",
            FeedKind::ServicePing => "plugin_ping",
        }
    }

    /// Build the integration id of a feed of this kind.
    ///
    /// `entity` is the host name for hosts and `description@host` for services.
    pub fn integration_id(&self, page_id: u64, space_id: u64, entity: &str) -> String {
        format!(
            "{}::page_{}:space_{}:{}::{}",
            self.entity_kind(),
            page_id,
            space_id,
            self.id_segment(),
            entity
        )
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_kind(), self.id_segment())
    }
}

/// Extra data forwarded with a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomData {
    pub tags: Tags,
}

impl CustomData {
    /// The `custom_data` object sent with an upsert.
    pub fn to_json(&self) -> Value {
        let tags: Map<String, Value> = self
            .tags
            .iter()
            .map(|(name, value)| (name.clone(), tag_json(value)))
            .collect();
        json!({ "tags": tags })
    }
}

fn tag_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::One(value) => Value::String(value.clone()),
        FieldValue::Many(values) => values.iter().cloned().map(Value::String).collect(),
    }
}

/// A reportable status channel for one host or service at one dashboard location.
///
/// Feeds are built once per exposure map and never change afterwards;
/// `dependencies` is filled in by the linker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub kind: FeedKind,
    pub integration_id: String,
    /// Name of the API key the feed is upserted with.
    pub api_key_name: String,
    pub name: String,
    pub description: String,
    pub organisation_id: u64,
    pub page_id: u64,
    pub space_id: u64,
    pub custom_data: CustomData,
    /// Integration ids of feeds this one depends on.
    pub dependencies: Vec<String>,
}

impl Feed {
    /// Combine the feed with a result into the upsert wire format.
    pub fn to_upsert(&self, result: &FeedResult) -> UpsertFeed {
        UpsertFeed {
            integration_id: self.integration_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            organisation_id: self.organisation_id,
            space_id: self.space_id,
            page_id: self.page_id,
            dependencies: self.dependencies.clone(),
            color: result.color,
            message: result.message.clone(),
            custom_data: self.custom_data.to_json(),
        }
    }
}

/// Evaluated status of a feed for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedResult {
    pub color: Color,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}
