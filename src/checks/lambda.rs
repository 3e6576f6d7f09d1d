use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{AuditContext, AuditResult};
use crate::engine::{collect_pages, CheckOutcome, CheckStatus, Resource, ResourceCheck};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::{LambdaSection, OutdatedFunction, StorageUsage};
use crate::models::resources::LambdaFunction;
use crate::provider::{fetch_deprecated_runtimes, LAMBDA_CODE_STORAGE_QUOTA};

const AUDIT: &str = "lambda";
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const STORAGE_WARNING_PERCENT: f64 = 80.0;

pub struct RuntimeCheck {
    deprecated: HashSet<String>,
}

impl RuntimeCheck {
    pub fn new<I: IntoIterator<Item = String>>(deprecated: I) -> Self {
        Self {
            deprecated: deprecated.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceCheck<LambdaFunction> for RuntimeCheck {
    async fn check(&self, function: &LambdaFunction) -> CheckOutcome {
        let id = function.resource_id();
        // Container-image functions report no runtime.
        let Some(runtime) = function.runtime.as_deref() else {
            return CheckOutcome::skipped(id, "function has no managed runtime");
        };
        if self.deprecated.contains(runtime) {
            CheckOutcome::fail(id, format!("runtime {runtime} is deprecated")).with_category(runtime)
        } else {
            CheckOutcome::pass(id).with_category(runtime)
        }
    }
}

/// Total code size against the code-storage quota; `None` when the quota is
/// unavailable.
pub fn storage_usage(functions: &[LambdaFunction], quota_gb: Option<f64>) -> Option<StorageUsage> {
    let quota_gb = quota_gb?;
    let used_bytes: i64 = functions.iter().filter_map(|f| f.code_size_bytes).sum();
    let used_gb = used_bytes as f64 / BYTES_PER_GB;
    let percentage = (quota_gb > 0.0).then(|| 100.0 * used_gb / quota_gb);
    Some(StorageUsage {
        used_gb,
        quota_gb,
        percentage,
    })
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<LambdaSection>, AuditError> {
    let functions = collect_pages(AUDIT, None, |cursor| ctx.provider.list_functions(cursor)).await?;

    let deprecated = fetch_deprecated_runtimes(
        ctx.settings.runtimes_url.as_deref(),
        &ctx.settings.deprecated_runtimes,
    )
    .await;

    let (service_code, quota_code) = LAMBDA_CODE_STORAGE_QUOTA;
    let quota_gb = match ctx.provider.service_quota(service_code, quota_code).await {
        Ok(quota) => quota.and_then(|q| q.value),
        Err(e) => {
            warn!(error = %e, "Lambda code storage quota unavailable");
            None
        }
    };
    let code_storage = storage_usage(&functions, quota_gb);

    let batch = ctx
        .scanner(AUDIT, ctx.settings.concurrency)
        .scan(functions, Arc::new(RuntimeCheck::new(deprecated)))
        .await;

    let outdated_runtimes: Vec<OutdatedFunction> = batch
        .with_status(CheckStatus::Fail)
        .filter_map(|o| {
            o.category.clone().map(|runtime| OutdatedFunction {
                function_name: o.resource_id.clone(),
                runtime,
            })
        })
        .collect();

    let mut findings: Vec<Finding> = outdated_runtimes
        .iter()
        .map(|f| {
            Finding::new(AUDIT, Severity::High, FindingCategory::Lifecycle, "Function uses a deprecated runtime")
                .resource(f.function_name.as_str())
                .detail(format!("Runtime {} no longer receives security patches.", f.runtime))
                .recommend("Migrate the function to a supported runtime version.")
        })
        .collect();

    if let Some(usage) = &code_storage {
        if let Some(pct) = usage.percentage.filter(|p| *p >= STORAGE_WARNING_PERCENT) {
            findings.push(
                Finding::new(AUDIT, Severity::Medium, FindingCategory::Capacity, "Lambda code storage nearly exhausted")
                    .detail(format!(
                        "{:.2} GB of {:.2} GB used ({:.2}%).",
                        usage.used_gb, usage.quota_gb, pct
                    ))
                    .recommend("Delete unused function versions and layers."),
            );
        }
    }

    let counts = batch.counts();
    info!(functions = batch.len(), outdated = outdated_runtimes.len(), "Lambda audit complete");
    Ok(AuditResult::new(
        LambdaSection {
            total_analyzed: batch.len(),
            outdated_runtimes,
            skipped: counts.skipped,
            code_storage,
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context_with;
    use crate::config::AuditSettings;

    fn settings() -> AuditSettings {
        AuditSettings {
            deprecated_runtimes: vec!["python2.7".into(), "nodejs12.x".into()],
            ..AuditSettings::default()
        }
    }

    #[tokio::test]
    async fn test_outdated_runtimes_and_storage() {
        let ctx = context_with(
            r#"
functions:
  - { function_name: old, runtime: python2.7, code_size_bytes: 1073741824 }
  - { function_name: current, runtime: python3.12, code_size_bytes: 1073741824 }
  - { function_name: image }
service_quotas:
  - { service_code: lambda, quota_code: L-2ACBD22F, value: 75.0 }
"#,
            settings(),
        );
        let result = audit(&ctx).await.unwrap();
        assert_eq!(result.section.total_analyzed, 3);
        assert_eq!(result.section.skipped, 1);
        assert_eq!(result.section.outdated_runtimes.len(), 1);
        assert_eq!(result.section.outdated_runtimes[0].runtime, "python2.7");

        let storage = result.section.code_storage.unwrap();
        assert!((storage.used_gb - 2.0).abs() < 1e-9);
        assert!((storage.percentage.unwrap() - 2.0 / 75.0 * 100.0).abs() < 1e-9);
        assert_eq!(result.findings.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_quota_leaves_storage_empty() {
        let ctx = context_with("functions: [{ function_name: f, runtime: nodejs12.x }]\n", settings());
        let result = audit(&ctx).await.unwrap();
        assert!(result.section.code_storage.is_none());
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_zero_quota_has_no_percentage() {
        let usage = storage_usage(&[], Some(0.0)).unwrap();
        assert!(usage.percentage.is_none());
    }
}
