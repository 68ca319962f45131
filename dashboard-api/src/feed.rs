//! Wire types for the feed upsert and token refresh endpoints.

use serde::{Deserialize, Serialize};

/// Traffic-light color shown for a feed on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Amber,
    Red,
    #[default]
    Default,
}

impl Color {
    /// Returns the wire name of the color.
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Amber => "amber",
            Color::Red => "red",
            Color::Default => "default",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single feed as accepted by the upsert endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertFeed {
    pub integration_id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "organisationId")]
    pub organisation_id: u64,
    #[serde(rename = "spaceId")]
    pub space_id: u64,
    #[serde(rename = "pageId")]
    pub page_id: u64,
    /// Integration ids of the feeds this one depends on.
    pub dependencies: Vec<String>,
    pub color: Color,
    pub message: String,
    pub custom_data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpsertRequest<'a> {
    pub feeds: &'a [UpsertFeed],
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub secret_key: &'a str,
    pub uuid: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}
