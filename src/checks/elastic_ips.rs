use tracing::info;

use super::{AuditContext, AuditResult};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::ElasticIpsSection;
use crate::models::resources::ElasticIp;

const AUDIT: &str = "elastic-ips";

/// Addresses with no association. The public IP names the address, falling
/// back to the allocation id.
pub fn orphaned_addresses(addresses: &[ElasticIp]) -> Vec<String> {
    addresses
        .iter()
        .filter(|a| a.association_id.is_none())
        .filter_map(|a| a.public_ip.clone().or_else(|| a.allocation_id.clone()))
        .collect()
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<ElasticIpsSection>, AuditError> {
    let addresses = ctx
        .provider
        .list_addresses()
        .await
        .map_err(|e| AuditError::enumeration(AUDIT, e))?;
    let orphaned = orphaned_addresses(&addresses);

    let findings = orphaned
        .iter()
        .map(|ip| {
            Finding::new(AUDIT, Severity::Low, FindingCategory::CostWaste, "Elastic IP is not associated")
                .resource(ip.as_str())
                .detail("Unassociated addresses are billed while idle.")
                .recommend("Release the address if it is no longer needed.")
        })
        .collect();

    info!(addresses = addresses.len(), orphaned = orphaned.len(), "Elastic IP audit complete");
    Ok(AuditResult::new(
        ElasticIpsSection {
            total_analyzed: addresses.len(),
            orphaned,
        },
        findings,
    ))
}
