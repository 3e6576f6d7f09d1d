//! Fan-out of per-resource checks over a fixed concurrency ceiling.
//!
//! Every dispatched resource yields exactly one [`CheckOutcome`]. A check that
//! panics or overruns its deadline is recorded as a failure for that resource
//! and the rest of the batch proceeds. [`BoundedScanner::scan`] only returns
//! after every task has been joined.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::outcome::{CheckOutcome, CheckStatus, Resource, ScanBatch};

/// A per-resource evaluation supplied by the caller.
///
/// Implementations classify their own failures: an ineligible resource is
/// reported as [`CheckStatus::Skipped`], a provider error as
/// [`CheckStatus::Fail`] with a detail message.
#[async_trait]
pub trait ResourceCheck<R>: Send + Sync {
    async fn check(&self, resource: &R) -> CheckOutcome;
}

/// Progress notifications emitted while a scan runs.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started {
        label: String,
        total: usize,
    },
    ItemCompleted {
        label: String,
        resource_id: String,
        status: CheckStatus,
    },
    Finished {
        label: String,
        passed: usize,
        failed: usize,
        skipped: usize,
    },
}

pub type ProgressSink = Arc<dyn Fn(ScanEvent) + Send + Sync>;

pub struct BoundedScanner {
    label: String,
    concurrency: usize,
    check_timeout: Option<Duration>,
    progress: Option<ProgressSink>,
}

impl BoundedScanner {
    /// `concurrency` is clamped to `[1, Semaphore::MAX_PERMITS]`.
    pub fn new(label: impl Into<String>, concurrency: usize) -> Self {
        Self {
            label: label.into(),
            concurrency: concurrency.clamp(1, Semaphore::MAX_PERMITS),
            check_timeout: None,
            progress: None,
        }
    }

    /// Bound each individual check; an overrun becomes a `Fail` for that resource.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(ref sink) = self.progress {
            sink(event);
        }
    }

    pub async fn scan<R>(&self, items: Vec<R>, check: Arc<dyn ResourceCheck<R>>) -> ScanBatch
    where
        R: Resource,
    {
        let total = items.len();
        info!(label = %self.label, total, concurrency = self.concurrency, "Starting bounded scan");
        self.emit(ScanEvent::Started {
            label: self.label.clone(),
            total,
        });

        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let (ids, handles): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|resource| {
                let resource_id = resource.resource_id().to_string();
                let semaphore = semaphore.clone();
                let check = check.clone();
                let progress = self.progress.clone();
                let label = self.label.clone();
                let timeout = self.check_timeout;

                let handle = tokio::spawn(async move {
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) => run_check(check.as_ref(), &resource, timeout).await,
                        Err(_) => CheckOutcome::fail(resource.resource_id(), "scanner semaphore closed"),
                    };
                    debug!(label = %label, resource_id = %outcome.resource_id, status = %outcome.status, "Check completed");
                    if let Some(sink) = progress {
                        sink(ScanEvent::ItemCompleted {
                            label,
                            resource_id: outcome.resource_id.clone(),
                            status: outcome.status,
                        });
                    }
                    outcome
                });
                (resource_id, handle)
            })
            .unzip();

        let results = futures::future::join_all(handles).await;

        let outcomes: Vec<CheckOutcome> = ids
            .into_iter()
            .zip(results)
            .map(|(resource_id, result)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(label = %self.label, resource_id = %resource_id, error = %e, "Check task panicked");
                    self.emit(ScanEvent::ItemCompleted {
                        label: self.label.clone(),
                        resource_id: resource_id.clone(),
                        status: CheckStatus::Fail,
                    });
                    CheckOutcome::fail(resource_id, format!("check aborted: {e}"))
                }
            })
            .collect();

        let batch = ScanBatch::from_outcomes(outcomes);
        let counts = batch.counts();
        info!(
            label = %self.label,
            passed = counts.passed,
            failed = counts.failed,
            skipped = counts.skipped,
            "Bounded scan complete"
        );
        self.emit(ScanEvent::Finished {
            label: self.label.clone(),
            passed: counts.passed,
            failed: counts.failed,
            skipped: counts.skipped,
        });
        batch
    }
}

async fn run_check<R>(
    check: &dyn ResourceCheck<R>,
    resource: &R,
    timeout: Option<Duration>,
) -> CheckOutcome
where
    R: Resource,
{
    match timeout {
        None => check.check(resource).await,
        Some(limit) => match tokio::time::timeout(limit, check.check(resource)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(resource_id = %resource.resource_id(), timeout_ms = limit.as_millis() as u64, "Check timed out");
                CheckOutcome::fail(
                    resource.resource_id(),
                    format!("check timed out after {}ms", limit.as_millis()),
                )
            }
        },
    }
}
