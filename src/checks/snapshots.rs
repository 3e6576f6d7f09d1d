use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{count_provider_failures, provider_failure, AuditContext, AuditResult};
use crate::engine::{collect_pages, CheckOutcome, CheckStatus, Resource, ResourceCheck};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::SnapshotsSection;
use crate::models::resources::Snapshot;
use crate::provider::CloudProvider;

const AUDIT: &str = "snapshots";
const PUBLIC_GROUP: &str = "all";
pub const PUBLIC_CATEGORY: &str = "public";

/// Fails a snapshot whose create-volume permissions include the `all` group.
pub struct PublicSnapshotCheck {
    provider: Arc<dyn CloudProvider>,
}

impl PublicSnapshotCheck {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ResourceCheck<Snapshot> for PublicSnapshotCheck {
    async fn check(&self, snapshot: &Snapshot) -> CheckOutcome {
        let Some(id) = snapshot.snapshot_id.as_deref() else {
            return CheckOutcome::skipped(snapshot.resource_id(), "snapshot has no id");
        };
        match self.provider.snapshot_volume_permissions(id).await {
            Ok(permissions) => {
                // Entries without a group grant access to specific accounts only.
                let public = permissions
                    .iter()
                    .any(|p| p.group.as_deref() == Some(PUBLIC_GROUP));
                if public {
                    CheckOutcome::fail(id, "create-volume permission granted to group 'all'")
                        .with_category(PUBLIC_CATEGORY)
                } else {
                    CheckOutcome::pass(id)
                }
            }
            Err(e) => provider_failure(id, "describe snapshot attribute", &e),
        }
    }
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<SnapshotsSection>, AuditError> {
    let snapshots = collect_pages(AUDIT, None, |cursor| ctx.provider.list_snapshots(cursor)).await?;
    let sampled = ctx.sample(AUDIT, snapshots).await;
    let (population, capped) = (sampled.population, sampled.was_capped());

    let check = Arc::new(PublicSnapshotCheck::new(ctx.provider.clone()));
    let batch = ctx
        .scanner(AUDIT, ctx.settings.concurrency)
        .scan(sampled.items, check)
        .await;

    let publicly_shared: Vec<String> = batch
        .with_status(CheckStatus::Fail)
        .filter(|o| o.category.as_deref() == Some(PUBLIC_CATEGORY))
        .map(|o| o.resource_id.clone())
        .collect();

    let findings = publicly_shared
        .iter()
        .map(|id| {
            Finding::new(
                AUDIT,
                Severity::Critical,
                FindingCategory::Exposure,
                "EBS snapshot is publicly restorable",
            )
            .resource(id.as_str())
            .detail("Any account can create a volume from this snapshot.")
            .recommend("Remove the 'all' group from the snapshot's createVolumePermission attribute.")
        })
        .collect();

    let counts = batch.counts();
    info!(population, analyzed = batch.len(), public = publicly_shared.len(), "Snapshot audit complete");

    Ok(AuditResult::new(
        SnapshotsSection {
            population,
            total_analyzed: batch.len(),
            sampled: capped,
            publicly_shared,
            skipped: counts.skipped,
            errors: count_provider_failures(&batch),
        },
        findings,
    ))
}
