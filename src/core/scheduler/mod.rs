//! # Scheduler Module
//!
//! Runs one metric backend call per pair on a bounded worker pool.
//!
//! ## How It Works
//! 1. All pairs go into a FIFO channel before any worker starts
//! 2. `workers` scoped threads each take the next pair, compare, classify
//!    and send the result back over a second channel
//! 3. The first failing worker stores its error and cancels the batch;
//!    nothing new is dispatched, calls in flight run to completion
//! 4. After every worker has joined, results are sorted by `original`
//!
//! ## Failure Semantics
//! Fail-fast, never partial: if any pair fails the caller gets the first
//! error (by completion time) and no results. Work that completed during
//! cancellation is collected and then discarded with the rest.

mod worker;

use crate::core::classifier::ThresholdClassifier;
use crate::core::crop::CropConfig;
use crate::core::metric::MetricBackend;
use crate::core::pairing::ComparisonPair;
use crate::error::BackendError;
use crate::events::{CompareEvent, Event, EventSender};
use crossbeam_channel::unbounded;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, info};
use worker::{SharedState, Worker};

/// Outcome of comparing one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// The earlier frame
    pub original: PathBuf,
    /// The later frame
    pub altered: PathBuf,
    /// Value reported by the metric backend
    pub difference: f64,
    /// Whether the value crossed the threshold
    pub is_abnormal: bool,
}

/// Shared flag telling workers to stop taking new pairs
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Bounded worker pool for backend calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScheduler {
    workers: usize,
}

impl BatchScheduler {
    /// Pool with an explicit size (at least one worker)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Pool sized to the host's available parallelism
    pub fn with_available_parallelism() -> Self {
        Self::new(default_workers())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers actually started for `pairs` pairs
    pub fn effective_workers(&self, pairs: usize) -> usize {
        self.workers.min(pairs).max(1)
    }

    /// Compare every pair, returning results sorted by `original`.
    pub fn run(
        &self,
        pairs: Vec<ComparisonPair>,
        backend: &dyn MetricBackend,
        classifier: &ThresholdClassifier,
        crop: Option<&CropConfig>,
        events: &EventSender,
    ) -> Result<Vec<ComparisonResult>, BackendError> {
        let total = pairs.len();
        let workers = self.effective_workers(total);

        info!(
            pairs = total,
            workers,
            metric = %backend.metric(),
            tool = %backend.tool().display(),
            "starting comparison batch"
        );
        events.send(Event::Compare(CompareEvent::Started {
            total_pairs: total,
            workers,
        }));

        let (queue_tx, queue_rx) = unbounded();
        for pair in pairs {
            // The receiver is alive, so sending cannot fail.
            let _ = queue_tx.send(pair);
        }
        drop(queue_tx);

        let (result_tx, result_rx) = unbounded();
        let first_error = Mutex::new(None);
        let cancel = CancellationToken::new();
        let completed = AtomicUsize::new(0);

        thread::scope(|scope| {
            for id in 0..workers {
                let worker = Worker {
                    id,
                    backend,
                    classifier,
                    crop,
                    events,
                };
                let shared = SharedState {
                    queue: queue_rx.clone(),
                    results: result_tx.clone(),
                    first_error: &first_error,
                    cancel: &cancel,
                    completed: &completed,
                    total,
                };
                scope.spawn(move || worker.run(shared));
            }
        });
        drop(result_tx);

        let mut results: Vec<ComparisonResult> = result_rx.try_iter().collect();

        let first_error = first_error
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(error) = first_error {
            debug!(
                completed = results.len(),
                total, "discarding results of cancelled batch"
            );
            return Err(error);
        }

        results.sort_by(|a, b| a.original.cmp(&b.original));
        debug_assert_eq!(results.len(), total);

        let total_abnormal = results.iter().filter(|r| r.is_abnormal).count();
        events.send(Event::Compare(CompareEvent::Completed {
            total_compared: results.len(),
            total_abnormal,
        }));
        info!(compared = results.len(), abnormal = total_abnormal, "comparison batch finished");

        Ok(results)
    }
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Host parallelism, falling back to one worker
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
