use tracing::{info, warn};

use super::{AuditContext, AuditResult};
use crate::engine::{collect_pages, find_overlaps, PrefixRecord};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::SubnetsSection;
use crate::models::resources::Subnet;

const AUDIT: &str = "subnets";

/// Prefix records for every subnet that has both an id and a CIDR block,
/// plus the number of subnets left out.
pub fn prefix_records(subnets: &[Subnet]) -> (Vec<PrefixRecord>, usize) {
    let mut skipped = 0;
    let records = subnets
        .iter()
        .filter_map(|s| match (&s.subnet_id, &s.cidr_block) {
            (Some(id), Some(cidr)) => Some(PrefixRecord::new(id.as_str(), cidr.as_str())),
            _ => {
                warn!(subnet_id = ?s.subnet_id, "Subnet lacks an id or CIDR block, skipping");
                skipped += 1;
                None
            }
        })
        .collect();
    (records, skipped)
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<SubnetsSection>, AuditError> {
    let subnets = collect_pages(AUDIT, None, |cursor| ctx.provider.list_subnets(cursor)).await?;
    let (records, skipped) = prefix_records(&subnets);
    let overlaps = find_overlaps(&records)?;

    let findings = overlaps
        .iter()
        .map(|pair| {
            Finding::new(AUDIT, Severity::Medium, FindingCategory::NetworkHygiene, "Subnets have overlapping CIDR blocks")
                .resource(pair.id_a.as_str())
                .detail(format!("{} overlaps {}.", pair.id_a, pair.id_b))
                .recommend("Re-plan the address space so each subnet owns a distinct range.")
        })
        .collect();

    info!(subnets = records.len(), overlaps = overlaps.len(), "Subnet audit complete");
    Ok(AuditResult::new(
        SubnetsSection {
            total_analyzed: records.len(),
            skipped,
            overlaps,
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    #[tokio::test]
    async fn test_overlap_scenario() {
        let ctx = context(
            r#"
subnets:
  - { subnet_id: a, cidr_block: 10.0.0.0/16 }
  - { subnet_id: b, cidr_block: 10.0.128.0/17 }
  - { subnet_id: c, cidr_block: 192.168.1.0/24 }
  - { subnet_id: d }
"#,
        );
        let result = audit(&ctx).await.unwrap();
        assert_eq!(result.section.total_analyzed, 3);
        assert_eq!(result.section.skipped, 1);
        assert_eq!(result.section.overlaps.len(), 1);
        assert_eq!(result.section.overlaps[0].id_a, "a");
        assert_eq!(result.section.overlaps[0].id_b, "b");
    }

    #[tokio::test]
    async fn test_malformed_cidr_aborts_audit() {
        let ctx = context("subnets: [{ subnet_id: bad, cidr_block: 10.0.0.0/40 }]\n");
        assert!(matches!(
            audit(&ctx).await.unwrap_err(),
            AuditError::MalformedPrefix { .. }
        ));
    }
}
