//! The poll pipeline.
//!
//! ## Submodules
//!
//! - [`schedule`]: cron schedules, the clock and the job scheduler
//! - [`batch`]: fixed-size batching
//! - [`sink`]: where batches go ([`DashboardSink`], [`DrySink`])
//!
//! ## Tick Flow
//!
//! ```text
//! StatusSource::open ──▶ StatusRecord* ──▶ ExposureMap lookup ──▶ evaluate
//!                                                                   │
//!                          ┌────────────────────────────────────────┘
//!                          ▼
//!                       Batcher ──(every batch_size)──▶ BatchSink::upsert
//!                          │
//!                          └──(end of stream)─────────▶ BatchSink::upsert
//! ```
//!
//! The snapshot is parsed on the blocking pool and records arrive over a
//! bounded channel, so a large `status.dat` never stalls a runtime worker.
//!
//! A failed batch is logged and the tick carries on. A parse error ends the
//! tick; batches already sent stay sent.

pub mod batch;
pub mod schedule;
pub mod sink;

pub use batch::Batcher;
pub use schedule::{Clock, JobHandle, PollSchedule, ScheduledJob, Scheduler, SystemClock};
pub use sink::{BatchSink, DashboardSink, DrySink, FeedUpdate};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::data::{evaluate_host, evaluate_service};
use crate::error::ParseError;
use crate::exposure::ExposureMap;
use crate::source::{StatusRecord, StatusSource, StatusStream};

/// Records parsed ahead of the tick.
const RECORD_BUFFER: usize = 256;

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Status records read, including ones with no feeds.
    pub records_seen: usize,
    /// Feed results produced and queued for upsert.
    pub results_produced: usize,
    /// Feeds skipped because their entity is in a soft state.
    pub results_suppressed: usize,
    pub feeds_upserted: usize,
    pub batches_upserted: usize,
    pub batches_failed: usize,
}

/// How a tick ended.
#[derive(Debug)]
pub enum TickOutcome {
    Completed(TickReport),
    /// Another tick was still running.
    Skipped,
    Failed { report: TickReport, error: ParseError },
}

impl TickOutcome {
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            TickOutcome::Completed(report) | TickOutcome::Failed { report, .. } => Some(report),
            TickOutcome::Skipped => None,
        }
    }
}

/// Reads the status snapshot and upserts feed results, one tick at a time.
pub struct Poller<S, K> {
    source: Mutex<S>,
    sink: K,
    exposures: RwLock<Arc<ExposureMap>>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl<S: StatusSource, K: BatchSink> Poller<S, K> {
    pub fn new(source: S, sink: K, exposures: Arc<ExposureMap>, batch_size: usize) -> Self {
        Self {
            source: Mutex::new(source),
            sink,
            exposures: RwLock::new(exposures),
            clock: Arc::new(SystemClock),
            batch_size,
        }
    }

    /// Use another clock for `updated_at` timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The exposure map the next tick will use.
    pub fn exposures(&self) -> Arc<ExposureMap> {
        self.exposures.read().clone()
    }

    /// Swap in a rebuilt exposure map. A tick in progress keeps the map it
    /// started with.
    pub fn replace_exposures(&self, exposures: Arc<ExposureMap>) {
        *self.exposures.write() = exposures;
    }

    /// Run one tick.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(mut source) = self.source.try_lock() else {
            warn!("previous tick still running, skipping");
            return TickOutcome::Skipped;
        };

        let exposures = self.exposures();
        let mut report = TickReport::default();
        let mut batcher = Batcher::new(self.batch_size);

        debug!(source = source.description(), "tick started");
        let mut records = match source.open() {
            Ok(stream) => read_records(stream),
            Err(error) => return TickOutcome::Failed { report, error },
        };

        while let Some(record) = records.recv().await {
            let record = match record {
                Ok(record) => record,
                Err(error) => return TickOutcome::Failed { report, error },
            };
            report.records_seen += 1;

            let now = self.clock.now();
            for update in evaluate_record(&exposures, &record, now, &mut report) {
                if let Some(batch) = batcher.push(update) {
                    self.flush(batch, &mut report).await;
                }
            }
        }

        if let Some(batch) = batcher.finish() {
            self.flush(batch, &mut report).await;
        }

        TickOutcome::Completed(report)
    }

    async fn flush(&self, batch: Vec<FeedUpdate>, report: &mut TickReport) {
        match self.sink.upsert(&batch).await {
            Ok(()) => {
                report.batches_upserted += 1;
                report.feeds_upserted += batch.len();
            }
            Err(e) => {
                report.batches_failed += 1;
                error!(error = %e, feeds = batch.len(), "batch upsert failed");
            }
        }
    }
}

/// Parse `stream` on the blocking pool and hand the records back in order.
///
/// Dropping the receiver stops the parser at its next record.
fn read_records(stream: StatusStream) -> mpsc::Receiver<Result<StatusRecord, ParseError>> {
    let (tx, rx) = mpsc::channel(RECORD_BUFFER);

    tokio::task::spawn_blocking(move || {
        for record in stream {
            if tx.blocking_send(record).is_err() {
                break;
            }
        }
    });

    rx
}

fn evaluate_record(
    exposures: &ExposureMap,
    record: &StatusRecord,
    now: DateTime<Utc>,
    report: &mut TickReport,
) -> Vec<FeedUpdate> {
    let results: Vec<_> = match record {
        StatusRecord::Host(status) => exposures
            .host_feeds(&status.id())
            .iter()
            .map(|feed| (feed, evaluate_host(feed, status, now)))
            .collect(),
        StatusRecord::Service(status) => exposures
            .service_feeds(&status.id())
            .iter()
            .map(|feed| (feed, evaluate_service(feed, status, now)))
            .collect(),
        StatusRecord::Info(_) => Vec::new(),
    };

    let mut updates = Vec::with_capacity(results.len());
    for (feed, result) in results {
        match result {
            Some(result) => {
                report.results_produced += 1;
                updates.push(FeedUpdate {
                    feed: feed.clone(),
                    result,
                });
            }
            None => report.results_suppressed += 1,
        }
    }
    updates
}

#[async_trait]
impl<S, K> ScheduledJob for Poller<S, K>
where
    S: StatusSource + 'static,
    K: BatchSink + 'static,
{
    fn name(&self) -> &str {
        "poll"
    }

    async fn run(&self) {
        match self.tick().await {
            TickOutcome::Completed(report) => info!(
                records = report.records_seen,
                results = report.results_produced,
                suppressed = report.results_suppressed,
                upserted = report.feeds_upserted,
                batches = report.batches_upserted,
                failed_batches = report.batches_failed,
                "tick completed"
            ),
            TickOutcome::Skipped => {}
            TickOutcome::Failed { report, error } => error!(
                error = %error,
                records = report.records_seen,
                batches = report.batches_upserted,
                "tick failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CustomData, Feed, FeedKind};
    use crate::error::BatchUpsertError;
    use crate::exposure::{link, UnlinkedExposures};
    use crate::source::{HostId, ServiceId, StatusParser, StatusStream};
    use chrono::TimeZone;
    use dashboard_api::{Color, DashboardError};
    use std::io::Cursor;

    #[derive(Debug)]
    struct TextSource(String);

    impl StatusSource for TextSource {
        fn open(&mut self) -> Result<StatusStream, ParseError> {
            Ok(StatusParser::new(Box::new(Cursor::new(self.0.clone().into_bytes()))))
        }

        fn description(&self) -> &str {
            "memory"
        }
    }

    #[derive(Debug)]
    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        batches: parking_lot::Mutex<Vec<Vec<FeedUpdate>>>,
        fail_call: Option<usize>,
    }

    #[async_trait]
    impl BatchSink for RecordingSink {
        async fn upsert(&self, batch: &[FeedUpdate]) -> Result<(), BatchUpsertError> {
            let mut batches = self.batches.lock();
            let call = batches.len();
            batches.push(batch.to_vec());
            if self.fail_call == Some(call) {
                return Err(BatchUpsertError {
                    api_key: "default".to_string(),
                    feeds: batch.len(),
                    source: DashboardError::Timeout,
                });
            }
            Ok(())
        }
    }

    impl RecordingSink {
        fn sizes(&self) -> Vec<usize> {
            self.batches.lock().iter().map(Vec::len).collect()
        }
    }

    fn feed(kind: FeedKind, entity: &str) -> Feed {
        Feed {
            kind,
            integration_id: kind.integration_id(1, 1, entity),
            api_key_name: "default".to_string(),
            name: entity.to_string(),
            description: String::new(),
            organisation_id: 1,
            page_id: 1,
            space_id: 1,
            custom_data: CustomData::default(),
            dependencies: vec![],
        }
    }

    fn exposures(services: usize) -> Arc<ExposureMap> {
        let mut unlinked = UnlinkedExposures::default();
        unlinked
            .add_host_feed(HostId::new("web01"), feed(FeedKind::HostStatus, "web01"))
            .unwrap();
        for n in 0..services {
            let id = ServiceId::new("web01", &format!("svc{n}"));
            let entity = id.to_string();
            unlinked
                .add_service_feed(id, feed(FeedKind::ServiceTransparent, &entity))
                .unwrap();
        }
        Arc::new(link(&unlinked))
    }

    fn service_block(n: usize, state: u8, state_type: u8) -> String {
        format!(
            "servicestatus {{\n\thost_name=web01\n\tservice_description=svc{n}\n\tcurrent_state={state}\n\tstate_type={state_type}\n\tplugin_output=output {n}\n\t}}\n"
        )
    }

    fn status_text(services: usize) -> String {
        let mut text = String::from("info {\n\tcreated=1700000000\n\tversion=4.4.6\n\t}\n");
        for n in 0..services {
            text.push_str(&service_block(n, 0, 1));
        }
        text
    }

    fn poller(
        text: String,
        sink: RecordingSink,
        map: Arc<ExposureMap>,
        batch_size: usize,
    ) -> Poller<TextSource, RecordingSink> {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Poller::new(TextSource(text), sink, map, batch_size).with_clock(Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn test_sixty_results_in_batches_of_25() {
        let poller = poller(status_text(60), RecordingSink::default(), exposures(60), 25);

        let TickOutcome::Completed(report) = poller.tick().await else {
            panic!("tick did not complete");
        };

        assert_eq!(poller.sink.sizes(), vec![25, 25, 10]);
        assert_eq!(report.records_seen, 61);
        assert_eq!(report.results_produced, 60);
        assert_eq!(report.feeds_upserted, 60);
        assert_eq!(report.batches_upserted, 3);
        assert_eq!(report.batches_failed, 0);

        let batches = poller.sink.batches.lock();
        assert_eq!(batches[0][0].feed.name, "svc0@web01");
        assert_eq!(batches[2][9].feed.name, "svc59@web01");
    }

    #[tokio::test]
    async fn test_results_carry_clock_and_dependencies() {
        let poller = poller(status_text(1), RecordingSink::default(), exposures(1), 25);
        poller.tick().await;

        let batches = poller.sink.batches.lock();
        let update = &batches[0][0];
        assert_eq!(update.result.color, Color::Green);
        assert_eq!(update.result.message, "output 0");
        assert_eq!(
            update.result.updated_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            update.feed.dependencies,
            vec!["host::page_1:space_1:status::web01".to_string()]
        );
    }

    #[derive(Debug)]
    struct TickingClock(parking_lot::Mutex<i64>);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut seconds = self.0.lock();
            *seconds += 1;
            Utc.timestamp_opt(1_700_000_000 + *seconds, 0).unwrap()
        }
    }

    #[tokio::test]
    async fn test_each_record_is_stamped_when_evaluated() {
        let poller = Poller::new(
            TextSource(status_text(2)),
            RecordingSink::default(),
            exposures(2),
            25,
        )
        .with_clock(Arc::new(TickingClock(parking_lot::Mutex::new(0))));
        poller.tick().await;

        let batches = poller.sink.batches.lock();
        let first = batches[0][0].result.updated_at;
        let second = batches[0][1].result.updated_at;
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_large_snapshot_streams_through_channel() {
        let count = RECORD_BUFFER * 3;
        let poller = poller(status_text(count), RecordingSink::default(), exposures(count), 100);

        let report = *poller.tick().await.report().unwrap();
        assert_eq!(report.records_seen, count + 1);
        assert_eq!(report.feeds_upserted, count);

        let batches = poller.sink.batches.lock();
        let last = batches.last().unwrap().last().unwrap();
        assert_eq!(last.feed.name, format!("svc{}@web01", count - 1));
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_later_batches() {
        let sink = RecordingSink {
            fail_call: Some(0),
            ..Default::default()
        };
        let poller = poller(status_text(60), sink, exposures(60), 25);

        let TickOutcome::Completed(report) = poller.tick().await else {
            panic!("tick did not complete");
        };

        assert_eq!(poller.sink.sizes(), vec![25, 25, 10]);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.batches_upserted, 2);
        assert_eq!(report.feeds_upserted, 35);
    }

    #[tokio::test]
    async fn test_parse_error_fails_only_the_tick() {
        let mut text = status_text(3);
        text.push_str("servicestatus {\n\thost_name=web01\n\tservice_description=svc9\n\tcurrent_state=0\n\tstate_type=x\n\t}\n");
        text.push_str(&service_block(4, 0, 1));
        let poller = poller(text, RecordingSink::default(), exposures(5), 2);

        let TickOutcome::Failed { report, error } = poller.tick().await else {
            panic!("tick did not fail");
        };
        assert!(matches!(error, ParseError::Schema(_)));
        assert_eq!(report.batches_upserted, 1);
        assert_eq!(poller.sink.sizes(), vec![2]);

        assert!(matches!(poller.tick().await, TickOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_soft_state_is_suppressed() {
        let text = format!("{}{}", service_block(0, 2, 0), service_block(1, 2, 1));
        let poller = poller(text, RecordingSink::default(), exposures(2), 25);

        let report = *poller.tick().await.report().unwrap();
        assert_eq!(report.results_suppressed, 1);
        assert_eq!(report.results_produced, 1);

        let batches = poller.sink.batches.lock();
        assert_eq!(batches[0][0].feed.name, "svc1@web01");
        assert_eq!(batches[0][0].result.color, Color::Red);
    }

    #[tokio::test]
    async fn test_records_without_feeds_are_ignored() {
        let poller = poller(status_text(3), RecordingSink::default(), exposures(0), 25);
        let report = *poller.tick().await.report().unwrap();
        assert_eq!(report.records_seen, 4);
        assert_eq!(report.results_produced, 0);
        assert!(poller.sink.sizes().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let poller = poller(status_text(1), RecordingSink::default(), exposures(1), 25);
        let guard = poller.source.lock().await;
        assert!(matches!(poller.tick().await, TickOutcome::Skipped));
        drop(guard);
        assert!(matches!(poller.tick().await, TickOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_replace_exposures() {
        let poller = poller(status_text(2), RecordingSink::default(), exposures(0), 25);
        assert_eq!(poller.tick().await.report().unwrap().results_produced, 0);

        poller.replace_exposures(exposures(2));
        assert_eq!(poller.exposures().feed_count(), 3);
        assert_eq!(poller.tick().await.report().unwrap().results_produced, 2);
    }
}
