use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use super::{count_provider_failures, provider_failure, AuditContext, AuditResult};
use crate::engine::{distribution, presence_percentage, CheckOutcome, CheckStatus, Resource, ResourceCheck};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::{BucketReport, S3Section};
use crate::models::resources::Bucket;
use crate::provider::CloudProvider;

const AUDIT: &str = "s3";
/// Objects listed per bucket to estimate its storage-class mix.
pub const OBJECT_SAMPLE_SIZE: usize = 100;
/// Listings omit the class for objects in the default tier.
const DEFAULT_STORAGE_CLASS: &str = "STANDARD";
pub const NO_LIFECYCLE_CATEGORY: &str = "no-lifecycle";

/// Samples a bucket's objects and looks up its lifecycle configuration.
///
/// Per-bucket storage-class reports are collected on the side while the scan
/// runs; read them with [`BucketCheck::into_reports`] afterwards.
pub struct BucketCheck {
    provider: Arc<dyn CloudProvider>,
    reports: Mutex<Vec<BucketReport>>,
}

impl BucketCheck {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self {
            provider,
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn into_reports(self) -> Vec<BucketReport> {
        let mut reports = self.reports.into_inner().unwrap_or_else(|e| e.into_inner());
        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }

    fn record(&self, report: BucketReport) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report);
    }
}

#[async_trait]
impl ResourceCheck<Bucket> for BucketCheck {
    async fn check(&self, bucket: &Bucket) -> CheckOutcome {
        let Some(name) = bucket.name.as_deref() else {
            return CheckOutcome::skipped(bucket.resource_id(), "bucket has no name");
        };

        let objects = match self.provider.list_objects(name, OBJECT_SAMPLE_SIZE).await {
            Ok(objects) => objects,
            Err(e @ AuditError::WrongRegion { .. }) => {
                info!(bucket = name, "Bucket is in another region, skipping");
                return CheckOutcome::skipped(name, e.to_string());
            }
            Err(e) => return provider_failure(name, "list objects", &e),
        };

        let has_lifecycle = match self.provider.bucket_has_lifecycle(name).await {
            Ok(has) => has,
            Err(e) => {
                info!(bucket = name, error = %e, "Lifecycle lookup failed, skipping bucket");
                return CheckOutcome::skipped(name, format!("lifecycle lookup failed: {e}"));
            }
        };

        self.record(BucketReport {
            name: name.to_string(),
            objects_sampled: objects.len(),
            storage_class_percentages: distribution(objects.iter().map(|o| {
                (
                    o.storage_class
                        .clone()
                        .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
                    1,
                )
            })),
            has_lifecycle_policy: has_lifecycle,
        });

        if has_lifecycle {
            CheckOutcome::pass(name)
        } else {
            CheckOutcome::fail(name, "no lifecycle configuration").with_category(NO_LIFECYCLE_CATEGORY)
        }
    }
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<S3Section>, AuditError> {
    let buckets = ctx
        .provider
        .list_buckets()
        .await
        .map_err(|e| AuditError::enumeration("buckets", e))?;
    let sampled = ctx.sample("buckets", buckets).await;
    let (total_buckets, capped) = (sampled.population, sampled.was_capped());

    let check = Arc::new(BucketCheck::new(ctx.provider.clone()));
    let batch = ctx
        .scanner(AUDIT, ctx.settings.bucket_concurrency)
        .scan(sampled.items, check.clone())
        .await;

    // The scanner has joined every task, so this is the last reference.
    let buckets = match Arc::try_unwrap(check) {
        Ok(check) => check.into_reports(),
        Err(_) => return Err(AuditError::Internal("bucket check still shared after scan".into())),
    };

    let without_lifecycle: Vec<&str> = batch
        .with_status(CheckStatus::Fail)
        .filter(|o| o.category.as_deref() == Some(NO_LIFECYCLE_CATEGORY))
        .map(|o| o.resource_id.as_str())
        .collect();
    let with_lifecycle = batch.with_status(CheckStatus::Pass).count();
    let percentage = presence_percentage(
        without_lifecycle.len(),
        without_lifecycle.len() + with_lifecycle,
    );

    let findings = without_lifecycle
        .iter()
        .map(|name| {
            Finding::new(AUDIT, Severity::Low, FindingCategory::Lifecycle, "Bucket has no lifecycle policy")
                .resource(*name)
                .detail("Objects are never transitioned to cheaper tiers or expired.")
                .recommend("Add lifecycle rules for transitions and expiration.")
        })
        .collect();

    let counts = batch.counts();
    info!(
        buckets = total_buckets,
        analyzed = batch.len(),
        skipped = counts.skipped,
        without_lifecycle = without_lifecycle.len(),
        "S3 audit complete"
    );

    Ok(AuditResult::new(
        S3Section {
            total_buckets,
            total_analyzed: batch.len(),
            sampled: capped,
            buckets,
            buckets_without_lifecycle_policy_percentage: percentage,
            skipped: counts.skipped,
            errors: count_provider_failures(&batch),
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    const INVENTORY: &str = r#"
buckets:
  - name: logs
    lifecycle: true
    objects:
      - { key: a, storage_class: STANDARD }
      - { key: b, storage_class: GLACIER }
      - { key: c, storage_class: GLACIER }
      - { key: d }
  - name: assets
    objects: [{ key: x, storage_class: STANDARD }]
  - name: elsewhere
    region: eu-west-1
  - name: flaky
  - name: broken
faults:
  "lifecycle:flaky": "InternalError"
  "objects:broken": "AccessDenied"
"#;

    #[tokio::test]
    async fn test_bucket_audit() {
        let result = audit(&context(INVENTORY)).await.unwrap();
        let section = &result.section;

        assert_eq!(section.total_buckets, 5);
        assert_eq!(section.total_analyzed, 5);
        assert_eq!(section.skipped, 2);
        assert_eq!(section.errors, 1);
        assert_eq!(section.buckets_without_lifecycle_policy_percentage, Some(50.0));

        assert_eq!(section.buckets.len(), 2);
        let logs = section.buckets.iter().find(|b| b.name == "logs").unwrap();
        assert_eq!(logs.objects_sampled, 4);
        assert_eq!(logs.storage_class_percentages[0].category, "GLACIER");
        assert_eq!(logs.storage_class_percentages[0].percentage, 50.0);
        assert_eq!(logs.storage_class_percentages[1].category, "STANDARD");

        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].resource_id.as_deref(), Some("assets"));
    }

    #[tokio::test]
    async fn test_no_processed_buckets_has_no_percentage() {
        let result = audit(&context("buckets: [{ name: far, region: ap-south-1 }]\n"))
            .await
            .unwrap();
        assert_eq!(result.section.skipped, 1);
        assert!(result.section.buckets_without_lifecycle_policy_percentage.is_none());
    }
}
