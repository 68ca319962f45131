//! Cron scheduling for recurring jobs.
//!
//! A job is run on every fire time of its [`PollSchedule`]. The scheduler
//! awaits each run before looking up the next fire time, so a job never
//! overlaps itself and fire times that pass while it runs are skipped.

use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// A parsed cron expression.
///
/// Accepts the classic five-field form (minute resolution) as well as the
/// six and seven-field forms with leading seconds and trailing years.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    expr: String,
    schedule: Schedule,
}

impl PollSchedule {
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let trimmed = expr.trim();
        let normalized = if trimmed.split_whitespace().count() == 5 {
            format!("0 {trimmed}")
        } else {
            trimmed.to_string()
        };

        let schedule = Schedule::from_str(&normalized).map_err(|e| ConfigError::Schedule {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            expr: trimmed.to_string(),
            schedule,
        })
    }

    /// The expression as configured.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// The first fire time strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A unit of work run by the scheduler.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run once. Failures are the job's to log.
    async fn run(&self);
}

/// Runs jobs on their schedules.
#[derive(Debug, Clone)]
pub struct Scheduler {
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Spawn a task running `job` on `schedule` until stopped.
    pub fn spawn<J: ScheduledJob>(&self, job: Arc<J>, schedule: PollSchedule) -> JobHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let clock = self.clock.clone();

        let task = tokio::spawn(async move {
            info!(job = job.name(), schedule = schedule.expr(), "job scheduled");

            loop {
                let now = clock.now();
                let Some(next) = schedule.next_after(&now) else {
                    warn!(job = job.name(), "schedule has no further fire times");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                debug!(job = job.name(), next = %next, "waiting for next run");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                job.run().await;

                if *stop_rx.borrow() {
                    break;
                }
            }

            info!(job = job.name(), "job stopped");
        });

        JobHandle { stop_tx, task }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// Handle for a scheduled job.
#[derive(Debug)]
pub struct JobHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Stop after the current run, if any, and wait for the task to end.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}
