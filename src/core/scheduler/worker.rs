//! A single scheduler worker draining the shared pair queue.

use super::{CancellationToken, ComparisonResult};
use crate::core::classifier::ThresholdClassifier;
use crate::core::crop::CropConfig;
use crate::core::metric::MetricBackend;
use crate::core::pairing::ComparisonPair;
use crate::error::BackendError;
use crate::events::{CompareEvent, CompareProgress, Event, EventSender};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, trace, warn};

/// State shared by every worker of one batch
pub(super) struct SharedState<'a> {
    pub queue: Receiver<ComparisonPair>,
    pub results: Sender<ComparisonResult>,
    pub first_error: &'a Mutex<Option<BackendError>>,
    pub cancel: &'a CancellationToken,
    pub completed: &'a AtomicUsize,
    pub total: usize,
}

pub(super) struct Worker<'a> {
    pub id: usize,
    pub backend: &'a dyn MetricBackend,
    pub classifier: &'a ThresholdClassifier,
    pub crop: Option<&'a CropConfig>,
    pub events: &'a EventSender,
}

impl Worker<'_> {
    /// Take pairs until the queue is empty or the batch is cancelled.
    ///
    /// A call already in flight when another worker cancels is allowed
    /// to finish; its result is still sent.
    pub fn run(self, shared: SharedState<'_>) {
        let mut handled = 0usize;

        loop {
            if shared.cancel.is_cancelled() {
                debug!(worker = self.id, "batch cancelled, stopping");
                break;
            }
            // The queue is filled before workers start, so empty means done.
            let Ok(pair) = shared.queue.try_recv() else {
                break;
            };

            trace!(worker = self.id, original = %pair.original.display(), "comparing");
            match self.backend.compare(&pair, self.crop) {
                Ok(difference) => {
                    handled += 1;
                    let result = ComparisonResult {
                        is_abnormal: self.classifier.classify(difference),
                        original: pair.original,
                        altered: pair.altered,
                        difference,
                    };
                    let completed = shared.completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.events.send(Event::Compare(CompareEvent::Progress(CompareProgress {
                        completed,
                        total: shared.total,
                        original: result.original.clone(),
                        altered: result.altered.clone(),
                        difference: result.difference,
                        is_abnormal: result.is_abnormal,
                    })));
                    let _ = shared.results.send(result);
                }
                Err(error) => {
                    warn!(worker = self.id, %error, "comparison failed, cancelling batch");
                    self.events.send(Event::Compare(CompareEvent::Failed {
                        original: pair.original.clone(),
                        altered: pair.altered.clone(),
                        message: error.to_string(),
                    }));
                    record_first_error(shared.first_error, error);
                    shared.cancel.cancel();
                    break;
                }
            }
        }

        debug!(worker = self.id, handled, "worker finished");
    }
}

/// Keep only the earliest failure by completion time
fn record_first_error(slot: &Mutex<Option<BackendError>>, error: BackendError) {
    let mut slot = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if slot.is_none() {
        *slot = Some(error);
    }
}
