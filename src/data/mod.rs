//! Feed models and status evaluation.
//!
//! ## Submodules
//!
//! - [`feed`]: [`Feed`] definitions, integration ids and [`FeedResult`]
//! - [`evaluate`]: maps a [`HostStatus`](crate::source::HostStatus) or
//!   [`ServiceStatus`](crate::source::ServiceStatus) to a [`FeedResult`]
//!
//! ## Data Flow
//!
//! ```text
//! StatusRecord (one per block in status.dat)
//!        │
//!        ▼
//! ExposureMap lookup by host/service id
//!        │
//!        ├──▶ Feed (one or more per entity)
//!        │
//!        └──▶ evaluate_host / evaluate_service ──▶ Option<FeedResult>
//! ```

pub mod evaluate;
pub mod feed;

pub use evaluate::{evaluate_host, evaluate_service, host_color, is_running_color, service_color};
pub use feed::{CustomData, Feed, FeedKind, FeedResult, Tags};
