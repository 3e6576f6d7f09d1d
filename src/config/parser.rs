use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::regions::region_name;
use super::schema::CONFIG_SCHEMA;
use super::types::{AuditConfig, AuditSettings, MAX_CONCURRENCY};
use crate::errors::AuditError;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

static REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d$").expect("valid region regex"));

pub async fn parse_config(path: &Path) -> Result<AuditConfig, AuditError> {
    if !path.exists() {
        return Err(AuditError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(AuditError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

/// Parse and validate configuration text.
pub fn parse_config_str(content: &str) -> Result<AuditConfig, AuditError> {
    // An empty document is a valid, all-defaults config.
    if content.trim().is_empty() {
        return Ok(AuditConfig::default());
    }

    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    validate_schema(&yaml)?;

    let config: AuditConfig = serde_yaml::from_value(yaml)?;

    validate_conflicts(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), AuditError> {
    let json_value: serde_json::Value = serde_json::to_value(yaml)
        .map_err(|e| AuditError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| AuditError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        // Advisory only; the semantic pass below rejects what matters.
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Reject values the typed config accepts but the engine cannot run with.
fn validate_conflicts(config: &AuditConfig) -> Result<(), AuditError> {
    if let Some(cap) = config.sampling.as_ref().and_then(|s| s.cap) {
        if cap < 0 {
            return Err(AuditError::Config(format!(
                "sampling.cap must be zero or positive, got {cap}"
            )));
        }
    }

    if let Some(checks) = &config.checks {
        if checks.is_empty() {
            warn!("Config selects no checks; only account information will be reported");
        }
    }

    validate_settings(&AuditSettings::from_config(config))
}

/// Semantic validation of resolved settings, run again after CLI overrides.
pub fn validate_settings(settings: &AuditSettings) -> Result<(), AuditError> {
    if !REGION_PATTERN.is_match(&settings.region) {
        return Err(AuditError::Config(format!(
            "Invalid region code '{}'",
            settings.region
        )));
    }
    if region_name(&settings.region) == "Unknown" {
        warn!(region = %settings.region, "Region code is not in the known region table");
    }

    for (name, value) in [
        ("concurrency.default", settings.concurrency),
        ("concurrency.buckets", settings.bucket_concurrency),
        ("concurrency.instances", settings.instance_concurrency),
    ] {
        if !(1..=MAX_CONCURRENCY).contains(&value) {
            return Err(AuditError::Config(format!(
                "{name} must be between 1 and {MAX_CONCURRENCY}, got {value}"
            )));
        }
    }

    if !(settings.cpu_threshold > 0.0 && settings.cpu_threshold <= 100.0) {
        return Err(AuditError::Config(format!(
            "instances.cpu_threshold must be in (0, 100], got {}",
            settings.cpu_threshold
        )));
    }
    if settings.timeframe_days < 1 {
        return Err(AuditError::Config(
            "instances.timeframe_days must be at least 1".into(),
        ));
    }
    if !(settings.cost_per_gb_month >= 0.0) {
        return Err(AuditError::Config(
            "volumes.cost_per_gb_month must not be negative".into(),
        ));
    }
    if settings.bar_width < 1 {
        return Err(AuditError::Config("output.bar_width must be at least 1".into()));
    }
    if settings.check_timeout.is_some_and(|t| t.is_zero()) {
        return Err(AuditError::Config(
            "concurrency.check_timeout_secs must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuditKind, OutputFormat};

    #[test]
    fn test_full_config_parses() {
        let yaml = r#"
region: eu-west-1
sampling:
  cap: 50
  seed: 7
concurrency:
  default: 4
  buckets: 8
checks: [s3, subnets]
instances:
  cpu_threshold: 15.5
output:
  format: json
  bar_width: 20
"#;
        let config = parse_config_str(yaml).unwrap();
        let settings = AuditSettings::from_config(&config);
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.sample_cap, 50);
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.bucket_concurrency, 8);
        assert_eq!(settings.instance_concurrency, 10);
        assert_eq!(settings.checks, vec![AuditKind::Subnets, AuditKind::S3]);
        assert_eq!(settings.output_format, OutputFormat::Json);
        assert_eq!(settings.bar_width, 20);
    }

    #[test]
    fn test_empty_config_is_defaults() {
        let config = parse_config_str("  \n").unwrap();
        assert!(config.region.is_none());
    }

    #[test]
    fn test_negative_cap_rejected() {
        let err = parse_config_str("sampling:\n  cap: -1\n").unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = parse_config_str("concurrency:\n  default: 0\n").unwrap_err();
        assert!(err.to_string().contains("concurrency.default"));
    }

    #[test]
    fn test_concurrency_ceiling() {
        let err = parse_config_str("concurrency:\n  buckets: 5000\n").unwrap_err();
        assert!(err.to_string().contains("concurrency.buckets"));
        assert!(parse_config_str("concurrency:\n  default: 1024\n").is_ok());

        let settings = AuditSettings {
            concurrency: usize::MAX,
            ..AuditSettings::default()
        };
        assert!(matches!(validate_settings(&settings), Err(AuditError::Config(_))));
    }

    #[test]
    fn test_cpu_threshold_bounds() {
        assert!(parse_config_str("instances:\n  cpu_threshold: 0\n").is_err());
        assert!(parse_config_str("instances:\n  cpu_threshold: 101\n").is_err());
        assert!(parse_config_str("instances:\n  cpu_threshold: 100\n").is_ok());
    }

    #[test]
    fn test_bad_region_rejected() {
        assert!(parse_config_str("region: Europe\n").is_err());
        assert!(parse_config_str("region: us-gov-west-1\n").is_ok());
    }

    #[test]
    fn test_unknown_check_is_yaml_error() {
        let err = parse_config_str("checks: [nope]\n").unwrap_err();
        assert!(matches!(err, AuditError::Yaml(_)));
    }

    #[test]
    fn test_zero_bar_width_rejected() {
        assert!(parse_config_str("output:\n  bar_width: 0\n").is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = parse_config(Path::new("/nonexistent/cloudsweep.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }
}
