//! # nagios-bridge
//!
//! Forwards Nagios host and service status to a status dashboard.
//!
//! The bridge reads the object cache Nagios writes at startup, matches hosts
//! and services against exposure rules from its configuration, and builds a
//! set of dashboard feeds. On a cron schedule it then reads the live status
//! snapshot, evaluates every exposed feed and upserts the results in batches.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │  config.toml ──▶ BridgeConfig ──▶ ExposureRules ─┐                  │
//! │                                                  ▼                  │
//! │  objects.cache ──▶ NagiosObjects ──────────▶ build + link           │
//! │                                                  │                  │
//! │                                                  ▼                  │
//! │                                         Arc<ExposureMap>            │
//! │                                                  │                  │
//! │  status.dat ──▶ StatusParser ──▶ Poller (tick) ◀─┘                  │
//! │                                      │                              │
//! │                                      ▼                              │
//! │                          Batcher ──▶ BatchSink ──▶ dashboard API    │
//! │                                          ▲                          │
//! │                 TokenRefreshJob ──▶ ApiKeys                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: parsers for `nagios.cfg`, `objects.cache` and
//!   `status.dat`, and the [`StatusSource`] trait
//! - **[`exposure`]**: match engine, interpolation, feed building and
//!   dependency linking
//! - **[`data`]**: feed models and status evaluation
//! - **[`poll`]**: scheduling, batching and the [`Poller`]
//! - **[`config`]**: TOML configuration with environment overrides
//! - **[`credentials`]**: api key tokens and their refresh job
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use nagios_bridge::{load_exposure_map, BridgeConfig, DrySink, NagiosPaths, Poller, StatusFile};
//!
//! # tokio_test::block_on(async {
//! let config = BridgeConfig::load(Path::new("config.toml")).unwrap();
//! let paths = NagiosPaths::load(&config.nagios_config_file_path).unwrap();
//! let map = load_exposure_map(&config.rules, &paths.object_cache_file).unwrap();
//!
//! let poller = Poller::new(StatusFile::new(&paths.status_file), DrySink, Arc::new(map), config.batch_size);
//! let outcome = poller.tick().await;
//! println!("{:?}", outcome.report());
//! # });
//! ```

pub mod config;
pub mod credentials;
pub mod data;
pub mod error;
pub mod exposure;
pub mod poll;
pub mod source;

pub use config::{ApiConfig, ApiKeyConfig, BridgeConfig};
pub use credentials::{ApiKeys, TokenRefreshJob, TokenRefresher, TOKEN_REFRESH_CRON};
pub use data::{Feed, FeedKind, FeedResult};
pub use error::{BatchUpsertError, BridgeError, ConfigError, DuplicateFeedError, ParseError};
pub use exposure::{ExposureMap, ExposureRules};
pub use poll::{
    BatchSink, Clock, DashboardSink, DrySink, FeedUpdate, PollSchedule, Poller, ScheduledJob,
    Scheduler, SystemClock, TickOutcome, TickReport,
};
pub use source::{NagiosObjects, NagiosPaths, StatusFile, StatusSource};

use std::path::Path;

use tracing::info;

/// Read the object cache and build the linked exposure map for `rules`.
pub fn load_exposure_map(
    rules: &ExposureRules,
    object_cache: &Path,
) -> Result<ExposureMap, BridgeError> {
    let objects = NagiosObjects::load(object_cache)?;
    info!(
        path = %object_cache.display(),
        hosts = objects.hosts.len(),
        services = objects.services.len(),
        "object cache loaded"
    );

    let map = ExposureMap::build(rules, &objects)?;
    info!(feeds = map.feed_count(), "exposure map built");
    Ok(map)
}
