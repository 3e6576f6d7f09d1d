//! One module per audit family. Each audit enumerates through the
//! [`CloudProvider`], caps with the shared [`Sampler`] where the population
//! can be large, fans per-resource checks out through a [`BoundedScanner`],
//! and returns a report section plus its findings.

pub mod account;
pub mod dynamodb;
pub mod ecr;
pub mod elastic_ips;
pub mod instances;
pub mod lambda;
pub mod quotas;
pub mod rds;
pub mod s3;
pub mod security_groups;
pub mod snapshots;
pub mod subnets;
pub mod volumes;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::config::AuditSettings;
use crate::engine::{BoundedScanner, CheckOutcome, CheckStatus, ProgressSink, Sampled, Sampler, ScanBatch};
use crate::errors::AuditError;
use crate::models::finding::Finding;
use crate::provider::CloudProvider;

/// Category given to outcomes whose check hit a provider error.
pub const ERROR_CATEGORY: &str = "error";

/// A report section and the findings that go with it.
#[derive(Debug, Clone)]
pub struct AuditResult<S> {
    pub section: S,
    pub findings: Vec<Finding>,
}

impl<S> AuditResult<S> {
    pub fn new(section: S, findings: Vec<Finding>) -> Self {
        Self { section, findings }
    }
}

/// Everything an audit needs: the provider, resolved settings, the run's
/// sampler, and an optional progress sink for its scans.
pub struct AuditContext {
    pub provider: Arc<dyn CloudProvider>,
    pub settings: AuditSettings,
    sampler: Mutex<Sampler>,
    progress: Option<ProgressSink>,
}

impl AuditContext {
    pub fn new(provider: Arc<dyn CloudProvider>, settings: AuditSettings) -> Self {
        let sampler = Sampler::new(settings.sample_cap, settings.seed);
        Self {
            provider,
            settings,
            sampler: Mutex::new(sampler),
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// A scanner for one audit, carrying the run's timeout and progress sink.
    pub fn scanner(&self, label: &str, concurrency: usize) -> BoundedScanner {
        let mut scanner = BoundedScanner::new(label, concurrency);
        if let Some(timeout) = self.settings.check_timeout {
            scanner = scanner.with_check_timeout(timeout);
        }
        if let Some(ref sink) = self.progress {
            scanner = scanner.with_progress(sink.clone());
        }
        scanner
    }

    pub async fn sample<T>(&self, resource: &str, items: Vec<T>) -> Sampled<T> {
        self.sampler.lock().await.sample(resource, items)
    }
}

/// Outcome for a check whose provider call failed.
pub(crate) fn provider_failure(resource_id: &str, operation: &str, err: &AuditError) -> CheckOutcome {
    warn!(resource_id, operation, error = %err, "Provider call failed during check");
    CheckOutcome::fail(resource_id, format!("{operation}: {err}")).with_category(ERROR_CATEGORY)
}

pub(crate) fn is_provider_failure(outcome: &CheckOutcome) -> bool {
    outcome.status == CheckStatus::Fail && outcome.category.as_deref() == Some(ERROR_CATEGORY)
}

/// Number of outcomes in `batch` that are provider failures.
pub(crate) fn count_provider_failures(batch: &ScanBatch) -> usize {
    batch.iter().filter(|o| is_provider_failure(o)).count()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::provider::{Inventory, InventoryProvider};

    pub fn context(yaml: &str) -> AuditContext {
        context_with(yaml, AuditSettings::default())
    }

    pub fn context_with(yaml: &str, mut settings: AuditSettings) -> AuditContext {
        let inventory = Inventory::from_yaml(yaml).unwrap();
        if settings.seed.is_none() {
            settings.seed = Some(42);
        }
        let provider = InventoryProvider::new(inventory, settings.region.clone()).with_page_size(3);
        AuditContext::new(Arc::new(provider), settings)
    }
}
