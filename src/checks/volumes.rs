use tracing::info;

use super::{AuditContext, AuditResult};
use crate::engine::collect_pages;
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::{OrphanedVolume, VolumesSection};
use crate::models::resources::Volume;

const AUDIT: &str = "volumes";
const AVAILABLE_STATE: &str = "available";

/// Volumes that are `available` with no attachments, largest first.
/// Volumes without an id are ignored; a missing size counts as zero.
pub fn orphaned_volumes(volumes: &[Volume], cost_per_gb_month: f64) -> Vec<OrphanedVolume> {
    let mut orphaned: Vec<OrphanedVolume> = volumes
        .iter()
        .filter(|v| v.state.as_deref() == Some(AVAILABLE_STATE) && v.attachments.is_empty())
        .filter_map(|v| {
            let size_gb = v.size_gb.unwrap_or(0);
            v.volume_id.clone().map(|volume_id| OrphanedVolume {
                volume_id,
                size_gb,
                monthly_cost_usd: size_gb as f64 * cost_per_gb_month,
            })
        })
        .collect();
    orphaned.sort_by(|a, b| b.size_gb.cmp(&a.size_gb).then_with(|| a.volume_id.cmp(&b.volume_id)));
    orphaned
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<VolumesSection>, AuditError> {
    let volumes = collect_pages(AUDIT, None, |cursor| ctx.provider.list_volumes(cursor)).await?;
    let orphaned = orphaned_volumes(&volumes, ctx.settings.cost_per_gb_month);

    let total_orphaned_gb: i64 = orphaned.iter().map(|v| v.size_gb).sum();
    let total_monthly_cost_usd: f64 = orphaned.iter().map(|v| v.monthly_cost_usd).sum();

    let findings = orphaned
        .iter()
        .map(|v| {
            Finding::new(AUDIT, Severity::Low, FindingCategory::CostWaste, "EBS volume is not attached")
                .resource(v.volume_id.as_str())
                .detail(format!(
                    "{} GB unattached, about ${:.2} per month.",
                    v.size_gb, v.monthly_cost_usd
                ))
                .recommend("Snapshot the volume if its data is needed, then delete it.")
        })
        .collect();

    info!(volumes = volumes.len(), orphaned = orphaned.len(), total_orphaned_gb, "Volume audit complete");
    Ok(AuditResult::new(
        VolumesSection {
            total_analyzed: volumes.len(),
            orphaned,
            total_orphaned_gb,
            total_monthly_cost_usd,
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    #[tokio::test]
    async fn test_orphans_sorted_by_size() {
        let ctx = context(
            r#"
volumes:
  - { volume_id: vol-small, size_gb: 8, state: available }
  - { volume_id: vol-big, size_gb: 500, state: available }
  - { volume_id: vol-used, size_gb: 100, state: in-use, attachments: [i-1] }
  - { volume_id: vol-creating, size_gb: 20, state: creating }
"#,
        );
        let result = audit(&ctx).await.unwrap();
        let ids: Vec<_> = result.section.orphaned.iter().map(|v| v.volume_id.as_str()).collect();
        assert_eq!(ids, vec!["vol-big", "vol-small"]);
        assert_eq!(result.section.total_orphaned_gb, 508);
        assert!((result.section.total_monthly_cost_usd - 50.8).abs() < 1e-9);
        assert_eq!(result.findings.len(), 2);
    }

    #[test]
    fn test_missing_size_counts_as_zero() {
        let volumes = vec![Volume {
            volume_id: Some("vol-1".into()),
            size_gb: None,
            state: Some("available".into()),
            attachments: vec![],
        }];
        let orphaned = orphaned_volumes(&volumes, 0.1);
        assert_eq!(orphaned[0].size_gb, 0);
        assert_eq!(orphaned[0].monthly_cost_usd, 0.0);
    }
}
