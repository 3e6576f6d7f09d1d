use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::{count_provider_failures, provider_failure, AuditContext, AuditResult};
use crate::engine::{collect_pages, distribution, CheckOutcome, CheckStatus, Resource, ResourceCheck};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::{InstancesSection, ReservedPurchase, UnderutilizedInstance, UtilizationSummary};
use crate::models::resources::{Instance, ReservedInstance};
use crate::provider::CloudProvider;

const AUDIT: &str = "instances";
const SECONDS_PER_YEAR: f64 = 31_536_000.0;
const UNKNOWN_TYPE: &str = "unknown";
pub const UNDERUTILIZED_CATEGORY: &str = "underutilized";

/// IMDSv1 is reachable when the endpoint is enabled and tokens are optional.
/// Instances reporting no metadata options are not counted.
pub fn uses_imdsv1(instance: &Instance) -> bool {
    instance.metadata_options.as_ref().is_some_and(|m| {
        m.http_endpoint.as_deref() == Some("enabled") && m.http_tokens.as_deref() == Some("optional")
    })
}

pub fn active_reservations(reserved: &[ReservedInstance]) -> Vec<ReservedPurchase> {
    reserved
        .iter()
        .filter(|r| r.state.as_deref() == Some("active"))
        .map(|r| ReservedPurchase {
            instance_type: r.instance_type.clone().unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            availability_zone: r.availability_zone.clone().unwrap_or_default(),
            instance_count: r.instance_count.unwrap_or(0),
            duration_years: r.duration_seconds.unwrap_or(0) as f64 / SECONDS_PER_YEAR,
        })
        .collect()
}

/// Flags running instances whose average CPU over the window sits below
/// the threshold.
pub struct UnderutilizationCheck {
    provider: Arc<dyn CloudProvider>,
    threshold: f64,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
}

impl UnderutilizationCheck {
    pub fn new(provider: Arc<dyn CloudProvider>, threshold: f64, timeframe_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            provider,
            threshold,
            window_start: now - Duration::days(i64::from(timeframe_days)),
            window_end: now,
        }
    }
}

#[async_trait]
impl ResourceCheck<Instance> for UnderutilizationCheck {
    async fn check(&self, instance: &Instance) -> CheckOutcome {
        let Some(id) = instance.instance_id.as_deref() else {
            return CheckOutcome::skipped(instance.resource_id(), "instance has no id");
        };
        match instance.launch_time {
            None => return CheckOutcome::skipped(id, "launch time unknown"),
            Some(launched) if launched > self.window_start => {
                info!(instance_id = id, "Instance started within the evaluation window, skipping");
                return CheckOutcome::skipped(id, "started within the evaluation window");
            }
            Some(_) => {}
        }

        match self
            .provider
            .average_cpu_utilization(id, self.window_start, self.window_end)
            .await
        {
            Ok(None) => CheckOutcome::skipped(id, "no CPU datapoints in window"),
            Ok(Some(average)) if average < self.threshold => CheckOutcome::fail(
                id,
                format!("average CPU {:.2}% below threshold {:.2}%", average, self.threshold),
            )
            .with_metric(average)
            .with_category(UNDERUTILIZED_CATEGORY),
            Ok(Some(average)) => CheckOutcome::pass(id).with_metric(average),
            Err(e) => provider_failure(id, "get CPU statistics", &e),
        }
    }
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<InstancesSection>, AuditError> {
    audit_at(ctx, Utc::now()).await
}

/// Run the instance audit with `now` as the end of the utilization window.
pub async fn audit_at(ctx: &AuditContext, now: DateTime<Utc>) -> Result<AuditResult<InstancesSection>, AuditError> {
    let instances = collect_pages(AUDIT, None, |cursor| ctx.provider.list_instances(cursor)).await?;
    let reserved = ctx
        .provider
        .list_reserved_instances()
        .await
        .map_err(|e| AuditError::enumeration("reserved instances", e))?;

    let instances_using_imdsv1: Vec<String> = instances
        .iter()
        .filter(|i| uses_imdsv1(i))
        .map(|i| i.resource_id().to_string())
        .collect();

    let spot = instances.iter().filter(|i| i.is_spot()).count();
    let lifecycle_distribution = distribution([("on-demand", instances.len() - spot), ("spot", spot)]);
    let type_distribution = distribution(instances.iter().map(|i| {
        (i.instance_type.clone().unwrap_or_else(|| UNKNOWN_TYPE.to_string()), 1)
    }));

    let running: Vec<Instance> = instances.iter().filter(|i| i.is_running()).cloned().collect();
    let running_count = running.len();
    let check = Arc::new(UnderutilizationCheck::new(
        ctx.provider.clone(),
        ctx.settings.cpu_threshold,
        ctx.settings.timeframe_days,
        now,
    ));
    let batch = ctx
        .scanner("instance utilization", ctx.settings.instance_concurrency)
        .scan(running, check)
        .await;

    let underutilized: Vec<UnderutilizedInstance> = batch
        .with_status(CheckStatus::Fail)
        .filter(|o| o.category.as_deref() == Some(UNDERUTILIZED_CATEGORY))
        .filter_map(|o| {
            o.metric.map(|average_cpu| UnderutilizedInstance {
                instance_id: o.resource_id.clone(),
                average_cpu,
            })
        })
        .collect();
    let counts = batch.counts();
    let errors = count_provider_failures(&batch);

    let mut findings: Vec<Finding> = instances_using_imdsv1
        .iter()
        .map(|id| {
            Finding::new(AUDIT, Severity::Medium, FindingCategory::Exposure, "Instance allows IMDSv1")
                .resource(id.as_str())
                .detail("The metadata endpoint is enabled with optional session tokens.")
                .recommend("Set HttpTokens to 'required' to enforce IMDSv2.")
        })
        .collect();
    findings.extend(underutilized.iter().map(|u| {
        Finding::new(AUDIT, Severity::Low, FindingCategory::CostWaste, "Instance is underutilized")
            .resource(u.instance_id.as_str())
            .detail(format!(
                "Average CPU {:.2}% over {} days, threshold {:.2}%.",
                u.average_cpu, ctx.settings.timeframe_days, ctx.settings.cpu_threshold
            ))
            .recommend("Downsize the instance or consolidate its workload.")
    }));

    info!(
        instances = instances.len(),
        running = running_count,
        underutilized = underutilized.len(),
        "Instance audit complete"
    );

    Ok(AuditResult::new(
        InstancesSection {
            total_instances: instances.len(),
            instances_using_imdsv1,
            lifecycle_distribution,
            type_distribution,
            reserved_purchases: active_reservations(&reserved),
            utilization: UtilizationSummary {
                cpu_threshold: ctx.settings.cpu_threshold,
                timeframe_days: ctx.settings.timeframe_days,
                running_instances: running_count,
                evaluated: counts.processed() - errors,
                skipped: counts.skipped,
                errors,
                underutilized,
            },
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    const INVENTORY: &str = r#"
instances:
  - instance_id: i-idle
    instance_type: m5.large
    state: running
    launch_time: 2024-01-01T00:00:00Z
    average_cpu: 3.5
    metadata_options: { http_endpoint: enabled, http_tokens: optional }
  - instance_id: i-busy
    instance_type: m5.large
    state: running
    launch_time: 2024-01-01T00:00:00Z
    average_cpu: 65.0
    metadata_options: { http_endpoint: enabled, http_tokens: required }
  - instance_id: i-new
    instance_type: t3.micro
    state: running
    lifecycle: spot
    launch_time: 2024-06-09T00:00:00Z
    average_cpu: 1.0
  - instance_id: i-quiet
    instance_type: t3.micro
    state: running
    launch_time: 2024-01-01T00:00:00Z
  - instance_id: i-denied
    instance_type: m5.large
    state: running
    launch_time: 2024-01-01T00:00:00Z
  - instance_id: i-stopped
    state: stopped
reserved_instances:
  - { instance_type: m5.large, availability_zone: us-east-1a, instance_count: 2, duration_seconds: 94608000, state: active }
  - { instance_type: m5.large, state: retired }
faults:
  "cpu:i-denied": "AccessDenied"
"#;

    #[tokio::test]
    async fn test_instance_audit() {
        let ctx = context(INVENTORY);
        let result = audit_at(&ctx, now()).await.unwrap();
        let section = &result.section;

        assert_eq!(section.total_instances, 6);
        assert_eq!(section.instances_using_imdsv1, vec!["i-idle"]);

        let utilization = &section.utilization;
        assert_eq!(utilization.running_instances, 5);
        assert_eq!(utilization.skipped, 2);
        assert_eq!(utilization.errors, 1);
        assert_eq!(utilization.evaluated, 2);
        assert_eq!(utilization.underutilized.len(), 1);
        assert_eq!(utilization.underutilized[0].instance_id, "i-idle");

        assert_eq!(section.reserved_purchases.len(), 1);
        assert!((section.reserved_purchases[0].duration_years - 3.0).abs() < 1e-9);

        assert_eq!(section.type_distribution[0].category, "m5.large");
        assert_eq!(section.type_distribution[0].count, 3);
        let spot = section
            .lifecycle_distribution
            .iter()
            .find(|e| e.category == "spot")
            .unwrap();
        assert_eq!(spot.count, 1);

        assert_eq!(result.findings.len(), 2);
    }

    #[test]
    fn test_imdsv1_requires_both_settings() {
        let mut instance = Instance::default();
        assert!(!uses_imdsv1(&instance));
        instance.metadata_options = Some(crate::models::resources::MetadataOptions {
            http_endpoint: Some("disabled".into()),
            http_tokens: Some("optional".into()),
        });
        assert!(!uses_imdsv1(&instance));
    }
}
