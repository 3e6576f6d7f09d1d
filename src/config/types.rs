use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AuditError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SAMPLE_CAP: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_BUCKET_CONCURRENCY: usize = 20;
pub const DEFAULT_INSTANCE_CONCURRENCY: usize = 10;
/// Upper bound for any concurrency setting.
pub const MAX_CONCURRENCY: usize = 1024;
pub const DEFAULT_CPU_THRESHOLD: f64 = 20.0;
pub const DEFAULT_TIMEFRAME_DAYS: u32 = 3;
pub const DEFAULT_COST_PER_GB_MONTH: f64 = 0.10;
pub const DEFAULT_BAR_WIDTH: usize = 15;

/// Runtimes used when the deprecated-runtime catalogue cannot be fetched.
pub const FALLBACK_DEPRECATED_RUNTIMES: &[&str] = &[
    "dotnetcore1.0",
    "dotnetcore2.0",
    "dotnetcore2.1",
    "dotnetcore3.1",
    "go1.x",
    "java8",
    "nodejs",
    "nodejs4.3",
    "nodejs6.10",
    "nodejs8.10",
    "nodejs10.x",
    "nodejs12.x",
    "nodejs14.x",
    "python2.7",
    "python3.6",
    "python3.7",
    "ruby2.5",
    "ruby2.7",
];

/// On-disk configuration. Every field is optional; see [`AuditSettings`] for
/// the resolved values.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuditConfig {
    pub region: Option<String>,
    pub sampling: Option<SamplingConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub checks: Option<Vec<AuditKind>>,
    pub instances: Option<InstancesConfig>,
    pub volumes: Option<VolumesConfig>,
    pub runtimes: Option<RuntimesConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SamplingConfig {
    pub cap: Option<i64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ConcurrencyConfig {
    pub default: Option<usize>,
    pub buckets: Option<usize>,
    pub instances: Option<usize>,
    pub check_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InstancesConfig {
    pub cpu_threshold: Option<f64>,
    pub timeframe_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VolumesConfig {
    pub cost_per_gb_month: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RuntimesConfig {
    pub source_url: Option<String>,
    pub deprecated: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    pub format: Option<OutputFormat>,
    pub bar_width: Option<usize>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The audit families that can be selected for a run, in execution order.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AuditKind {
    Snapshots,
    SecurityGroups,
    ElasticIps,
    Subnets,
    Volumes,
    Instances,
    Lambda,
    Rds,
    S3,
    Dynamodb,
    Ecr,
    Quotas,
}

impl AuditKind {
    pub const ALL: [AuditKind; 12] = [
        AuditKind::Snapshots,
        AuditKind::SecurityGroups,
        AuditKind::ElasticIps,
        AuditKind::Subnets,
        AuditKind::Volumes,
        AuditKind::Instances,
        AuditKind::Lambda,
        AuditKind::Rds,
        AuditKind::S3,
        AuditKind::Dynamodb,
        AuditKind::Ecr,
        AuditKind::Quotas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshots => "snapshots",
            Self::SecurityGroups => "security-groups",
            Self::ElasticIps => "elastic-ips",
            Self::Subnets => "subnets",
            Self::Volumes => "volumes",
            Self::Instances => "instances",
            Self::Lambda => "lambda",
            Self::Rds => "rds",
            Self::S3 => "s3",
            Self::Dynamodb => "dynamodb",
            Self::Ecr => "ecr",
            Self::Quotas => "quotas",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Snapshots => "Public EBS Snapshots",
            Self::SecurityGroups => "Security Groups",
            Self::ElasticIps => "Elastic IPs",
            Self::Subnets => "Overlapping Subnets",
            Self::Volumes => "Orphaned EBS Volumes",
            Self::Instances => "EC2 Instances",
            Self::Lambda => "Lambda Runtimes",
            Self::Rds => "RDS Instances",
            Self::S3 => "S3 Buckets",
            Self::Dynamodb => "DynamoDB Capacity",
            Self::Ecr => "ECR Repositories",
            Self::Quotas => "Service Quotas",
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AuditKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = AuditKind::ALL.iter().map(|k| k.as_str()).collect();
                AuditError::Config(format!(
                    "Unknown check '{}'; expected one of: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Parse a comma-separated check list such as `s3,subnets`.
pub fn parse_check_list(raw: &str) -> Result<Vec<AuditKind>, AuditError> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(AuditKind::from_str)
        .collect()
}

/// Fully resolved run settings: config file values over built-in defaults,
/// with CLI overrides applied on top by the caller.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    pub region: String,
    pub sample_cap: usize,
    pub seed: Option<u64>,
    pub concurrency: usize,
    pub bucket_concurrency: usize,
    pub instance_concurrency: usize,
    pub check_timeout: Option<Duration>,
    pub checks: Vec<AuditKind>,
    pub cpu_threshold: f64,
    pub timeframe_days: u32,
    pub cost_per_gb_month: f64,
    pub runtimes_url: Option<String>,
    pub deprecated_runtimes: Vec<String>,
    pub output_format: OutputFormat,
    pub bar_width: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self::from_config(&AuditConfig::default())
    }
}

impl AuditSettings {
    pub fn from_config(config: &AuditConfig) -> Self {
        let sampling = config.sampling.clone().unwrap_or_default();
        let concurrency = config.concurrency.clone().unwrap_or_default();
        let instances = config.instances.clone().unwrap_or_default();
        let volumes = config.volumes.clone().unwrap_or_default();
        let runtimes = config.runtimes.clone().unwrap_or_default();
        let output = config.output.clone().unwrap_or_default();

        let mut checks = config
            .checks
            .clone()
            .unwrap_or_else(|| AuditKind::ALL.to_vec());
        checks.sort();
        checks.dedup();

        Self {
            region: config
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            sample_cap: sampling
                .cap
                .map(|c| c.max(0) as usize)
                .unwrap_or(DEFAULT_SAMPLE_CAP),
            seed: sampling.seed,
            concurrency: concurrency.default.unwrap_or(DEFAULT_CONCURRENCY),
            bucket_concurrency: concurrency.buckets.unwrap_or(DEFAULT_BUCKET_CONCURRENCY),
            instance_concurrency: concurrency
                .instances
                .unwrap_or(DEFAULT_INSTANCE_CONCURRENCY),
            check_timeout: concurrency.check_timeout_secs.map(Duration::from_secs),
            checks,
            cpu_threshold: instances.cpu_threshold.unwrap_or(DEFAULT_CPU_THRESHOLD),
            timeframe_days: instances.timeframe_days.unwrap_or(DEFAULT_TIMEFRAME_DAYS),
            cost_per_gb_month: volumes
                .cost_per_gb_month
                .unwrap_or(DEFAULT_COST_PER_GB_MONTH),
            runtimes_url: runtimes.source_url,
            deprecated_runtimes: runtimes.deprecated.unwrap_or_else(|| {
                FALLBACK_DEPRECATED_RUNTIMES
                    .iter()
                    .map(|r| r.to_string())
                    .collect()
            }),
            output_format: output.format.unwrap_or_default(),
            bar_width: output.bar_width.unwrap_or(DEFAULT_BAR_WIDTH),
        }
    }

    pub fn runs(&self, kind: AuditKind) -> bool {
        self.checks.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AuditSettings::default();
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.sample_cap, 100);
        assert_eq!(settings.concurrency, 10);
        assert_eq!(settings.bucket_concurrency, 20);
        assert_eq!(settings.instance_concurrency, 10);
        assert_eq!(settings.cpu_threshold, 20.0);
        assert_eq!(settings.timeframe_days, 3);
        assert_eq!(settings.bar_width, 15);
        assert_eq!(settings.checks.len(), AuditKind::ALL.len());
        assert!(settings.deprecated_runtimes.contains(&"python2.7".to_string()));
    }

    #[test]
    fn test_negative_cap_resolves_to_zero() {
        let config = AuditConfig {
            sampling: Some(SamplingConfig {
                cap: Some(-5),
                seed: None,
            }),
            ..Default::default()
        };
        assert_eq!(AuditSettings::from_config(&config).sample_cap, 0);
    }

    #[test]
    fn test_audit_kind_round_trips_through_str() {
        for kind in AuditKind::ALL {
            assert_eq!(kind.as_str().parse::<AuditKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_audit_kind_serde_is_kebab_case() {
        let json = serde_json::to_string(&AuditKind::SecurityGroups).unwrap();
        assert_eq!(json, "\"security-groups\"");
    }

    #[test]
    fn test_parse_check_list() {
        let checks = parse_check_list("s3, subnets,,lambda").unwrap();
        assert_eq!(
            checks,
            vec![AuditKind::S3, AuditKind::Subnets, AuditKind::Lambda]
        );
        assert!(parse_check_list("s3,bogus").is_err());
    }

    #[test]
    fn test_checks_are_ordered_and_deduplicated() {
        let config = AuditConfig {
            checks: Some(vec![AuditKind::S3, AuditKind::Snapshots, AuditKind::S3]),
            ..Default::default()
        };
        let settings = AuditSettings::from_config(&config);
        assert_eq!(settings.checks, vec![AuditKind::Snapshots, AuditKind::S3]);
        assert!(settings.runs(AuditKind::S3));
        assert!(!settings.runs(AuditKind::Rds));
    }

    #[test]
    fn test_output_format_deserialize() {
        let parsed: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(parsed, OutputFormat::Json);
    }
}
