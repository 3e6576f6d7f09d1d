use tracing::info;

use super::{AuditContext, AuditResult};
use crate::engine::collect_pages;
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::{QuotaUsage, QuotasSection};
use crate::models::resources::ServiceQuota;

const AUDIT: &str = "quotas";
pub const WARNING_PERCENT: f64 = 80.0;
pub const EXHAUSTED_PERCENT: f64 = 100.0;

/// Utilization of a quota; `None` unless both value and usage are reported
/// and the value is positive.
pub fn utilization(quota: &ServiceQuota) -> Option<f64> {
    match (quota.value, quota.usage) {
        (Some(value), Some(usage)) if value > 0.0 => Some(100.0 * usage / value),
        _ => None,
    }
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<QuotasSection>, AuditError> {
    let quotas = collect_pages(AUDIT, None, |cursor| ctx.provider.list_service_quotas(cursor)).await?;

    let mut evaluated = 0;
    let mut saturated = Vec::new();
    for quota in &quotas {
        let Some(percentage) = utilization(quota) else {
            continue;
        };
        evaluated += 1;
        if percentage >= WARNING_PERCENT {
            saturated.push(QuotaUsage {
                service_code: quota.service_code.clone().unwrap_or_default(),
                quota_name: quota
                    .quota_name
                    .clone()
                    .or_else(|| quota.quota_code.clone())
                    .unwrap_or_default(),
                usage: quota.usage.unwrap_or_default(),
                value: quota.value.unwrap_or_default(),
                percentage,
            });
        }
    }
    saturated.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let findings = saturated
        .iter()
        .map(|q| {
            let severity = if q.percentage >= EXHAUSTED_PERCENT {
                Severity::High
            } else {
                Severity::Medium
            };
            Finding::new(AUDIT, severity, FindingCategory::Capacity, "Service quota nearly exhausted")
                .resource(format!("{}/{}", q.service_code, q.quota_name))
                .detail(format!("{} of {} used ({:.2}%).", q.usage, q.value, q.percentage))
                .recommend("Request a quota increase or reduce usage.")
        })
        .collect();

    info!(quotas = quotas.len(), evaluated, saturated = saturated.len(), "Quota audit complete");
    Ok(AuditResult::new(
        QuotasSection {
            total_quotas: quotas.len(),
            evaluated,
            saturated,
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    #[tokio::test]
    async fn test_saturated_quotas() {
        let ctx = context(
            r#"
service_quotas:
  - { service_code: ec2, quota_name: Running instances, value: 100, usage: 85 }
  - { service_code: vpc, quota_name: VPCs per region, value: 5, usage: 5 }
  - { service_code: s3, quota_name: Buckets, value: 100, usage: 10 }
  - { service_code: iam, quota_name: Roles, value: 1000 }
  - { service_code: sns, quota_name: Topics, value: 0, usage: 3 }
"#,
        );
        let result = audit(&ctx).await.unwrap();
        assert_eq!(result.section.total_quotas, 5);
        assert_eq!(result.section.evaluated, 3);
        assert_eq!(result.section.saturated.len(), 2);
        assert_eq!(result.section.saturated[0].service_code, "vpc");
        assert_eq!(result.findings[0].severity, Severity::High);
        assert_eq!(result.findings[1].severity, Severity::Medium);
    }
}
