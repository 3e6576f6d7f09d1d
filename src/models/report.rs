use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::finding::Finding;
use crate::engine::{DistributionEntry, OverlapPair};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInformation {
    pub account_id: String,
    pub account_alias: String,
    pub region_code: String,
    pub region_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotsSection {
    pub population: usize,
    pub total_analyzed: usize,
    pub sampled: bool,
    pub publicly_shared: Vec<String>,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPortIssue {
    pub security_group_id: String,
    pub port_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRangeIssue {
    pub security_group_id: String,
    pub port: Option<i64>,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupsSection {
    pub total_analyzed: usize,
    pub open_port_ranges: Vec<OpenPortIssue>,
    pub broad_private_sources: Vec<SourceRangeIssue>,
    pub excessively_open_inbound_rules: Vec<SourceRangeIssue>,
    pub default_group_instances: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticIpsSection {
    pub total_analyzed: usize,
    pub orphaned: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetsSection {
    pub total_analyzed: usize,
    /// Subnets lacking an id or CIDR block.
    pub skipped: usize,
    pub overlaps: Vec<OverlapPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedVolume {
    pub volume_id: String,
    pub size_gb: i64,
    pub monthly_cost_usd: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesSection {
    pub total_analyzed: usize,
    pub orphaned: Vec<OrphanedVolume>,
    pub total_orphaned_gb: i64,
    pub total_monthly_cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedPurchase {
    pub instance_type: String,
    pub availability_zone: String,
    pub instance_count: i64,
    pub duration_years: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderutilizedInstance {
    pub instance_id: String,
    pub average_cpu: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationSummary {
    pub cpu_threshold: f64,
    pub timeframe_days: u32,
    pub running_instances: usize,
    pub evaluated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub underutilized: Vec<UnderutilizedInstance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesSection {
    pub total_instances: usize,
    #[serde(rename = "instancesUsingIMDv1")]
    pub instances_using_imdsv1: Vec<String>,
    pub lifecycle_distribution: Vec<DistributionEntry>,
    pub type_distribution: Vec<DistributionEntry>,
    pub reserved_purchases: Vec<ReservedPurchase>,
    pub utilization: UtilizationSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutdatedFunction {
    pub function_name: String,
    pub runtime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub used_gb: f64,
    pub quota_gb: f64,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaSection {
    pub total_analyzed: usize,
    pub outdated_runtimes: Vec<OutdatedFunction>,
    pub skipped: usize,
    pub code_storage: Option<StorageUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInstanceReport {
    pub identifier: String,
    pub issues: Vec<String>,
    pub backup_retention_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdsSection {
    pub total_analyzed: usize,
    pub instances: Vec<DbInstanceReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketReport {
    pub name: String,
    pub objects_sampled: usize,
    pub storage_class_percentages: Vec<DistributionEntry>,
    pub has_lifecycle_policy: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Section {
    pub total_buckets: usize,
    pub total_analyzed: usize,
    pub sampled: bool,
    pub buckets: Vec<BucketReport>,
    pub buckets_without_lifecycle_policy_percentage: Option<f64>,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamoDbSection {
    pub total_tables: usize,
    pub provisioned_tables: usize,
    pub on_demand_tables: usize,
    pub skipped: usize,
    pub errors: usize,
    pub capacity_distribution: Vec<DistributionEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoriesSection {
    pub total_analyzed: usize,
    pub public_repositories: Vec<String>,
    pub without_policy: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaUsage {
    pub service_code: String,
    pub quota_name: String,
    pub usage: f64,
    pub value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotasSection {
    pub total_quotas: usize,
    pub evaluated: usize,
    pub saturated: Vec<QuotaUsage>,
}

/// Per-audit sections; an audit that was not selected, or failed, is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSections {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<SnapshotsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<SecurityGroupsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic_ips: Option<ElasticIpsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<SubnetsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes: Option<VolumesSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<InstancesSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<LambdaSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rds: Option<RdsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamo_db: Option<DynamoDbSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repositories: Option<RepositoriesSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_quotas: Option<QuotasSection>,
}

/// An audit that could not produce a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFailure {
    pub audit: String,
    pub error_type: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub account_information: AccountInformation,
    pub findings: Vec<Finding>,
    pub sections: ReportSections,
    pub failures: Vec<AuditFailure>,
}
