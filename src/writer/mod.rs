//! # Batch Writer Module
//!
//! Reliable batched writes of time-series points to a [`PointStore`].
//!
//! This module handles:
//! - Grouping points into batches of at most `batch_size`
//! - Retrying failed batches with capped exponential backoff
//! - Flushing buffered points when a batch fills or the jittered flush interval elapses
//! - Emitting success / error / retry events to a [`WriteObserver`]
//! - Draining or discarding buffered points on shutdown
//!
//! Each batch moves through
//! `Pending -> InFlight -> {Succeeded | Retrying -> InFlight | Failed}`.
//! An in-flight batch is never cancelled; shutdown waits for it.
//!
//! ## Usage
//!
//! ```no_run
//! use sonde_ingest::store::InfluxStore;
//! use sonde_ingest::writer::{BatchWriter, Shutdown};
//! use sonde_ingest::writer::observer::LoggingObserver;
//! use sonde_ingest::writer::options::WriteOptions;
//! use sonde_ingest::config::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = InfluxStore::new(&config.store)?;
//!     let writer = BatchWriter::new(store, WriteOptions::default(), Arc::new(LoggingObserver));
//!
//!     let summary = writer.write(Vec::new()).await?;
//!     writer.close(Shutdown::Drain).await?;
//!     println!("{} batches written", summary.batches);
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod observer;
pub mod options;

use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, trace, warn};

use crate::points::mapper::TimePoint;
use crate::store::PointStore;
use backoff::{flush_delay, jitter, retry_delay};
use observer::{BatchFailure, BatchRetry, BatchSuccess, WriteObserver};
use options::WriteOptions;

/// Lifecycle of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    InFlight,
    Retrying,
    Succeeded,
    Failed,
}

impl BatchState {
    /// Whether the batch has reached a final state
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Succeeded | BatchState::Failed)
    }
}

/// What to do with buffered points when the writer is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Write every pending point before returning
    Drain,
    /// Drop pending points
    Discard,
}

/// Totals for successfully written batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Batches accepted by the store
    pub batches: usize,
    /// Points in accepted batches
    pub points: usize,
    /// Retries spent across all batches, including failed ones
    pub retries: usize,
}

/// A batch that exhausted its retries or was rejected outright
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedBatch {
    pub batch_id: u64,
    pub attempts: u32,
    pub error: String,
    pub points: Vec<TimePoint>,
}

/// Terminal writer errors
#[derive(Debug, Error)]
pub enum WriteError {
    /// One or more batches could not be written
    #[error("{} batch(es) failed after exhausting retries ({} points not written)",
        .failed.len(), unwritten_points(.failed))]
    Exhausted {
        failed: Vec<FailedBatch>,
        summary: WriteSummary,
    },

    /// The writer no longer accepts points
    #[error("Batch writer is closed")]
    Closed,
}

fn unwritten_points(failed: &[FailedBatch]) -> usize {
    failed.iter().map(|batch| batch.points.len()).sum()
}

/// Outcome of driving one batch to a terminal state
#[derive(Debug)]
enum BatchOutcome {
    Succeeded { points: usize, retries: u32 },
    Failed { batch: FailedBatch, retries: u32 },
}

/// Accumulated batch outcomes
#[derive(Debug, Default)]
struct Outcomes {
    summary: WriteSummary,
    failed: Vec<FailedBatch>,
}

impl Outcomes {
    fn record(&mut self, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Succeeded { points, retries } => {
                self.summary.batches += 1;
                self.summary.points += points;
                self.summary.retries += retries as usize;
            }
            BatchOutcome::Failed { batch, retries } => {
                self.summary.retries += retries as usize;
                self.failed.push(batch);
            }
        }
    }

    fn into_result(self) -> Result<WriteSummary, WriteError> {
        if self.failed.is_empty() {
            Ok(self.summary)
        } else {
            Err(WriteError::Exhausted {
                failed: self.failed,
                summary: self.summary,
            })
        }
    }
}

/// Which buffered points a flush takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushScope {
    /// Only complete batches
    FullBatches,
    /// Everything, including a trailing partial batch
    All,
}

/// Split buffered points into batches, leaving the remainder in `buffer`
fn take_batches(
    buffer: &mut Vec<TimePoint>,
    batch_size: usize,
    scope: FlushScope,
) -> Vec<Vec<TimePoint>> {
    let full = buffer.len() / batch_size * batch_size;
    let take = match scope {
        FlushScope::FullBatches => full,
        FlushScope::All => buffer.len(),
    };

    let mut taken: Vec<TimePoint> = buffer.drain(..take).collect();
    let mut batches = Vec::with_capacity(take.div_ceil(batch_size));
    while !taken.is_empty() {
        let rest = taken.split_off(taken.len().min(batch_size));
        batches.push(taken);
        taken = rest;
    }
    batches
}

/// State shared between the writer handle and its flush task
struct Shared<S> {
    store: S,
    options: WriteOptions,
    observer: Arc<dyn WriteObserver>,
    /// Points submitted in fire-and-forget mode, not yet batched
    buffer: Mutex<Vec<TimePoint>>,
    /// Outcomes of batches written by the flush task
    outcomes: Mutex<Outcomes>,
    wake: Notify,
    next_batch_id: AtomicU64,
}

impl<S: PointStore> Shared<S> {
    /// Call an observer hook, swallowing panics
    fn notify(&self, hook: &str, call: impl FnOnce(&dyn WriteObserver)) {
        let observer = self.observer.as_ref();
        if panic::catch_unwind(AssertUnwindSafe(|| call(observer))).is_err() {
            warn!("Write observer panicked in {}; ignoring", hook);
        }
    }

    /// Drive one batch until it succeeds or fails for good
    async fn send_batch(&self, points: Vec<TimePoint>) -> BatchOutcome {
        let batch_id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
        let len = points.len();
        let mut state = BatchState::Pending;
        let mut attempts = 0u32;
        let mut last_error = String::new();

        while !state.is_terminal() {
            state = match state {
                BatchState::Pending | BatchState::Retrying => BatchState::InFlight,
                BatchState::InFlight => {
                    attempts += 1;
                    match self.store.write_batch(&points).await {
                        Ok(()) => {
                            self.notify("on_success", |o| o.on_success(&BatchSuccess {
                                batch_id,
                                points: len,
                                attempts,
                            }));
                            BatchState::Succeeded
                        }
                        Err(e) => {
                            let will_retry =
                                e.is_retryable() && attempts < self.options.max_retries;
                            last_error = e.to_string();

                            self.notify("on_error", |o| o.on_error(&BatchFailure {
                                batch_id,
                                points: len,
                                attempt: attempts,
                                error: last_error.clone(),
                                will_retry,
                            }));

                            if will_retry {
                                let delay = retry_delay(&self.options, attempts);
                                self.notify("on_retry", |o| o.on_retry(&BatchRetry {
                                    batch_id,
                                    points: len,
                                    retry: attempts,
                                    delay,
                                    error: last_error.clone(),
                                }));
                                sleep(delay).await;
                                BatchState::Retrying
                            } else {
                                BatchState::Failed
                            }
                        }
                    }
                }
                terminal => terminal,
            };
            trace!("Batch {} -> {:?}", batch_id, state);
        }

        let retries = attempts.saturating_sub(1);
        if state == BatchState::Succeeded {
            debug!("Batch {} written ({} points, {} retries)", batch_id, len, retries);
            BatchOutcome::Succeeded { points: len, retries }
        } else {
            error!(
                "Batch {} failed after {} attempt(s), {} points not written: {}",
                batch_id, attempts, len, last_error
            );
            BatchOutcome::Failed {
                batch: FailedBatch {
                    batch_id,
                    attempts,
                    error: last_error,
                    points,
                },
                retries,
            }
        }
    }

    /// Write buffered points and record their outcomes
    async fn flush_pending(&self, scope: FlushScope) {
        let batches = {
            let mut buffer = self.buffer.lock().await;
            take_batches(&mut buffer, self.options.batch_size, scope)
        };

        if batches.is_empty() {
            return;
        }
        debug!("Flushing {} buffered batch(es)", batches.len());

        for batch in batches {
            let outcome = self.send_batch(batch).await;
            self.outcomes.lock().await.record(outcome);
        }
    }
}

/// Background task: flush full batches after a jittered wake-up, everything on the timer
async fn run_flusher<S: PointStore>(shared: Arc<Shared<S>>, mut shutdown: watch::Receiver<bool>) {
    let mut deadline = Instant::now() + flush_delay(&shared.options);
    let mut wake_at: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => {
                wake_at = None;
                shared.flush_pending(FlushScope::All).await;
                deadline = Instant::now() + flush_delay(&shared.options);
            }
            _ = sleep_until(wake_at.unwrap_or(deadline)), if wake_at.is_some() => {
                wake_at = None;
                shared.flush_pending(FlushScope::FullBatches).await;
            }
            _ = shared.wake.notified(), if wake_at.is_none() => {
                wake_at = Some(Instant::now() + jitter(&shared.options));
            }
            _ = shutdown.changed() => break,
        }
    }

    debug!("Flush task stopped");
}

/// Batching, retrying writer over a [`PointStore`]
///
/// Safe to share between producers (e.g. behind an `Arc`). Must be created
/// inside a tokio runtime since it spawns its flush task.
pub struct BatchWriter<S: PointStore + 'static> {
    shared: Arc<Shared<S>>,
    shutdown: watch::Sender<bool>,
    flusher: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<S: PointStore + 'static> BatchWriter<S> {
    /// Create a writer and start its flush task
    ///
    /// # Arguments
    ///
    /// * `store` - Store the writer owns for its whole session
    /// * `options` - Batching and retry tuning
    /// * `observer` - Receiver of success / error / retry events
    pub fn new(store: S, options: WriteOptions, observer: Arc<dyn WriteObserver>) -> Self {
        let shared = Arc::new(Shared {
            store,
            options,
            observer,
            buffer: Mutex::new(Vec::new()),
            outcomes: Mutex::new(Outcomes::default()),
            wake: Notify::new(),
            next_batch_id: AtomicU64::new(1),
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let flusher = tokio::spawn(run_flusher(Arc::clone(&shared), shutdown_rx));

        Self {
            shared,
            shutdown,
            flusher: Mutex::new(Some(flusher)),
            closed: AtomicBool::new(false),
        }
    }

    /// Write points and wait until every batch is written or has failed
    ///
    /// # Returns
    ///
    /// * `Ok(WriteSummary)` - All batches accepted
    ///
    /// # Errors
    ///
    /// * `WriteError::Exhausted` - Lists each failed batch with its points
    /// * `WriteError::Closed` - Writer was closed
    pub async fn write(&self, mut points: Vec<TimePoint>) -> Result<WriteSummary, WriteError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WriteError::Closed);
        }

        let batches = take_batches(&mut points, self.shared.options.batch_size, FlushScope::All);
        debug!("Writing {} batch(es)", batches.len());

        let mut outcomes = Outcomes::default();
        for batch in batches {
            outcomes.record(self.shared.send_batch(batch).await);
        }
        outcomes.into_result()
    }

    /// Buffer points for a background flush and return immediately
    ///
    /// Outcomes are reported through the observer and returned by [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// * `WriteError::Closed` - Writer was closed
    pub async fn submit(&self, points: Vec<TimePoint>) -> Result<(), WriteError> {
        let full = {
            let mut buffer = self.shared.buffer.lock().await;
            // Checked under the buffer lock so close cannot drain in between
            if self.closed.load(Ordering::Acquire) {
                return Err(WriteError::Closed);
            }
            buffer.extend(points);
            buffer.len() >= self.shared.options.batch_size
        };

        if full {
            self.shared.wake.notify_one();
        }
        Ok(())
    }

    /// Number of points waiting in the buffer
    pub async fn pending(&self) -> usize {
        self.shared.buffer.lock().await.len()
    }

    /// Stop the writer
    ///
    /// Waits for an in-flight background batch, then drains or discards the
    /// buffer according to `mode`.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteSummary)` - Totals for every batch written in the background
    ///
    /// # Errors
    ///
    /// * `WriteError::Exhausted` - Some background batches failed
    /// * `WriteError::Closed` - Writer was already closed
    pub async fn close(&self, mode: Shutdown) -> Result<WriteSummary, WriteError> {
        {
            let _buffer = self.shared.buffer.lock().await;
            if self.closed.swap(true, Ordering::AcqRel) {
                return Err(WriteError::Closed);
            }
        }

        let _ = self.shutdown.send(true);
        if let Some(handle) = self.flusher.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Flush task ended abnormally: {}", e);
            }
        }

        match mode {
            Shutdown::Drain => self.shared.flush_pending(FlushScope::All).await,
            Shutdown::Discard => {
                let discarded = std::mem::take(&mut *self.shared.buffer.lock().await);
                if !discarded.is_empty() {
                    warn!("Discarding {} pending points on shutdown", discarded.len());
                }
            }
        }

        let outcomes = std::mem::take(&mut *self.shared.outcomes.lock().await);
        outcomes.into_result()
    }
}

impl<S: PointStore + 'static> Drop for BatchWriter<S> {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            if let Ok(buffer) = self.shared.buffer.try_lock() {
                if !buffer.is_empty() {
                    warn!("Batch writer dropped without close; {} pending points lost", buffer.len());
                }
            }
        }
        let _ = self.shutdown.send(true);
    }
}
