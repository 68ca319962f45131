//! Batch sinks: where evaluated feeds go.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashboard_api::{DashboardClient, DashboardError, UpsertFeed};
use tracing::{debug, info, warn};

use crate::credentials::ApiKeys;
use crate::data::{Feed, FeedResult};
use crate::error::BatchUpsertError;

/// A feed and its result for the current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUpdate {
    pub feed: Feed,
    pub result: FeedResult,
}

impl FeedUpdate {
    pub fn to_upsert(&self) -> UpsertFeed {
        self.feed.to_upsert(&self.result)
    }
}

/// Receives batches of updates from the poller.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn upsert(&self, batch: &[FeedUpdate]) -> Result<(), BatchUpsertError>;
}

/// Upserts batches to the dashboard API.
///
/// A batch can mix feeds of several api keys; each key's share is sent as a
/// separate request with that key's current token.
#[derive(Debug, Clone)]
pub struct DashboardSink {
    client: DashboardClient,
    keys: ApiKeys,
}

impl DashboardSink {
    pub fn new(client: DashboardClient, keys: ApiKeys) -> Self {
        Self { client, keys }
    }
}

fn group_by_api_key(batch: &[FeedUpdate]) -> BTreeMap<&str, Vec<UpsertFeed>> {
    let mut groups: BTreeMap<&str, Vec<UpsertFeed>> = BTreeMap::new();
    for update in batch {
        groups
            .entry(update.feed.api_key_name.as_str())
            .or_default()
            .push(update.to_upsert());
    }
    groups
}

#[async_trait]
impl BatchSink for DashboardSink {
    async fn upsert(&self, batch: &[FeedUpdate]) -> Result<(), BatchUpsertError> {
        let mut first_error = None;

        for (api_key, feeds) in group_by_api_key(batch) {
            let result = match self.keys.token(api_key) {
                Some(token) => self.client.upsert_feeds(&token, &feeds).await,
                None => Err(DashboardError::Auth(format!("no token for api key '{api_key}'"))),
            };

            match result {
                Ok(()) => debug!(api_key, feeds = feeds.len(), "feeds upserted"),
                Err(source) => {
                    let err = BatchUpsertError {
                        api_key: api_key.to_string(),
                        feeds: feeds.len(),
                        source,
                    };
                    if first_error.is_none() {
                        first_error = Some(err);
                    } else {
                        warn!(error = %err, "additional upsert failure in batch");
                    }
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

/// Logs every update instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrySink;

#[async_trait]
impl BatchSink for DrySink {
    async fn upsert(&self, batch: &[FeedUpdate]) -> Result<(), BatchUpsertError> {
        for update in batch {
            info!(
                feed = %update.feed.integration_id,
                name = %update.feed.name,
                color = %update.result.color,
                message = %update.result.message,
                dependencies = ?update.feed.dependencies,
                "dry run"
            );
        }
        Ok(())
    }
}
