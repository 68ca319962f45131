//! # dashboard-api
//!
//! Client for the status dashboard that nagios-bridge reports into.
//!
//! The dashboard groups feeds into organisations, pages and spaces. Each
//! feed is identified by a caller-chosen integration id, so repeated upserts
//! of the same id update the existing feed instead of creating a new one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dashboard_api::{Color, DashboardClient, UpsertFeed};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DashboardClient::builder()
//!         .upsert_endpoint("https://dashboard.example/api/feeds")
//!         .token_endpoint("https://dashboard.example/api/token")
//!         .build()?;
//!
//!     let token = client.refresh_token("secret", "uuid").await?;
//!
//!     let feed = UpsertFeed {
//!         integration_id: "host::page_1:space_1:status::web01".to_string(),
//!         name: "web01".to_string(),
//!         description: "web01 status".to_string(),
//!         organisation_id: 1,
//!         space_id: 1,
//!         page_id: 1,
//!         dependencies: vec![],
//!         color: Color::Green,
//!         message: "PING OK".to_string(),
//!         custom_data: serde_json::json!({}),
//!     };
//!     client.upsert_feeds(&token, &[feed]).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod feed;

pub use client::{DashboardClient, DashboardClientBuilder};
pub use error::DashboardError;
pub use feed::{Color, UpsertFeed};
