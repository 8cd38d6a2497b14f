//! Polling scheduler and the per-cycle pipeline.
//!
//! [`Pipeline::run_cycle`] performs one fetch → parse → build → broadcast
//! → persist pass. [`Scheduler`] drives it on a fixed interval from a
//! single task that owns an explicit Idle/Running state: a tick that fires
//! while a cycle is still in flight is dropped, so at most one fetch is
//! ever outstanding.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use crate::domain::{Broadcaster, Snapshot};
use crate::error::CycleError;
use crate::persistence::SnapshotStore;
use crate::report::{ReportSource, parse_report};

/// Bounded retry with doubling backoff, applied to fetch and persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    async fn run<T, E, F, Fut>(&self, operation: &'static str, mut attempt_once: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut delay = self.backoff;
        let mut attempt = 0;
        loop {
            match attempt_once().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Sort key of the snapshot produced.
    pub sort_key: String,
    /// Number of records in the snapshot.
    pub records: usize,
    /// Subscribers the snapshot was queued for.
    pub receivers: usize,
    /// Whether the store accepted the snapshot.
    pub persisted: bool,
}

/// Everything one cycle needs: the report source, the broadcaster and the
/// store.
#[derive(Debug)]
pub struct Pipeline {
    source: Arc<dyn ReportSource>,
    broadcaster: Broadcaster,
    store: Arc<dyn SnapshotStore>,
    retry: RetryPolicy,
    last_cycle_at: Mutex<Option<DateTime<Utc>>>,
}

impl Pipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        source: Arc<dyn ReportSource>,
        broadcaster: Broadcaster,
        store: Arc<dyn SnapshotStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            broadcaster,
            store,
            retry,
            last_cycle_at: Mutex::new(None),
        }
    }

    /// Runs one full cycle.
    ///
    /// The snapshot time is taken when the cycle starts, before fetching.
    /// Every snapshot gets a sort key strictly greater than the previous
    /// one, even when two cycles start within the same second.
    ///
    /// The snapshot is broadcast before it is persisted. A persist failure
    /// is logged and reported in [`CycleReport::persisted`]; it does not
    /// fail the cycle or undo the broadcast.
    ///
    /// # Errors
    ///
    /// Returns a [`CycleError`] if the report cannot be fetched or parsed.
    /// Nothing is broadcast or persisted in that case.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let started_at = Utc::now();
        let body = self.retry.run("fetch", || self.source.fetch()).await?;
        let records = parse_report(&body)?;
        let snapshot = Arc::new(Snapshot::build(self.cycle_time(started_at), records));

        let receivers = self.broadcaster.publish(Arc::clone(&snapshot));

        let persisted = match self.retry.run("persist", || self.store.put(&snapshot)).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    sort_key = snapshot.sort_key(),
                    error = %err,
                    "failed to persist snapshot"
                );
                false
            }
        };

        Ok(CycleReport {
            sort_key: snapshot.sort_key().to_string(),
            records: snapshot.records().len(),
            receivers,
            persisted,
        })
    }
}

impl Pipeline {
    /// Moves `started_at` to the next whole second when it falls in the
    /// same second as the previous snapshot (or earlier).
    fn cycle_time(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self
            .last_cycle_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let at = match *last {
            Some(previous) if started_at.timestamp() <= previous.timestamp() => {
                DateTime::from_timestamp(previous.timestamp() + 1, 0).unwrap_or(started_at)
            }
            _ => started_at,
        };
        *last = Some(at);
        at
    }
}

type CycleFuture = Pin<Box<dyn Future<Output = Result<CycleReport, CycleError>> + Send>>;

enum SchedulerState {
    Idle,
    Running(CycleFuture),
}

impl SchedulerState {
    const fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    /// Resolves when the running cycle finishes; never resolves when idle.
    async fn in_flight(&mut self) -> Result<CycleReport, CycleError> {
        match self {
            Self::Running(cycle) => cycle.await,
            Self::Idle => std::future::pending().await,
        }
    }
}

/// Counters accumulated over a scheduler run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycles that produced and broadcast a snapshot.
    pub completed: u64,
    /// Cycles aborted by a fetch or parse failure.
    pub failed: u64,
    /// Completed cycles whose snapshot the store did not accept.
    pub persist_failures: u64,
    /// Ticks dropped because a cycle was still running.
    pub dropped_ticks: u64,
}

impl SchedulerStats {
    fn record(&mut self, outcome: &Result<CycleReport, CycleError>) {
        match outcome {
            Ok(report) => {
                self.completed += 1;
                if !report.persisted {
                    self.persist_failures += 1;
                }
                tracing::info!(
                    sort_key = %report.sort_key,
                    records = report.records,
                    receivers = report.receivers,
                    persisted = report.persisted,
                    "cycle complete"
                );
            }
            Err(err) => {
                self.failed += 1;
                tracing::warn!(stage = err.stage(), error = %err, "cycle aborted");
            }
        }
    }
}

/// Fixed-interval driver for [`Pipeline`] cycles.
#[derive(Debug)]
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler ticking every `interval`.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Runs cycles until `shutdown` resolves, then waits for the in-flight
    /// cycle (if any) and returns the accumulated counters.
    ///
    /// The first tick fires immediately. Cycle failures are logged and
    /// never stop the loop.
    pub async fn run<S>(self, shutdown: S) -> SchedulerStats
    where
        S: Future<Output = ()> + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut state = SchedulerState::Idle;
        let mut stats = SchedulerStats::default();
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = self.interval.as_secs_f64(), "scheduler started");

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if state.is_running() {
                        stats.dropped_ticks += 1;
                        tracing::debug!("previous cycle still running, tick dropped");
                    } else {
                        let pipeline = Arc::clone(&self.pipeline);
                        state = SchedulerState::Running(Box::pin(async move {
                            pipeline.run_cycle().await
                        }));
                    }
                }
                outcome = state.in_flight(), if state.is_running() => {
                    state = SchedulerState::Idle;
                    stats.record(&outcome);
                }
            }
        }

        if let SchedulerState::Running(cycle) = state {
            tracing::info!("waiting for in-flight cycle before stopping");
            stats.record(&cycle.await);
        }
        tracing::info!(
            completed = stats.completed,
            failed = stats.failed,
            dropped_ticks = stats.dropped_ticks,
            "scheduler stopped"
        );
        stats
    }
}
