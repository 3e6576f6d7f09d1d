use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{count_provider_failures, provider_failure, AuditContext, AuditResult};
use crate::engine::{collect_pages, CheckOutcome, CheckStatus, Resource, ResourceCheck};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::RepositoriesSection;
use crate::models::resources::Repository;
use crate::provider::CloudProvider;

const AUDIT: &str = "ecr";
pub const PUBLIC_CATEGORY: &str = "public";

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(rename = "Statement", default)]
    statements: Statements,
}

/// `Statement` may be a single object or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Statements {
    Many(Vec<PolicyStatement>),
    One(PolicyStatement),
}

impl Default for Statements {
    fn default() -> Self {
        Statements::Many(Vec::new())
    }
}

impl Statements {
    fn as_slice(&self) -> &[PolicyStatement] {
        match self {
            Statements::One(statement) => std::slice::from_ref(statement),
            Statements::Many(statements) => statements,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PolicyStatement {
    #[serde(rename = "Effect")]
    effect: Option<String>,
    #[serde(rename = "Principal")]
    principal: Option<Value>,
}

fn is_wildcard(principal: &Value) -> bool {
    match principal {
        Value::String(s) => s == "*",
        Value::Array(items) => items.iter().any(is_wildcard),
        Value::Object(map) => map.get("AWS").is_some_and(is_wildcard),
        _ => false,
    }
}

/// Whether a repository policy allows any principal.
pub fn policy_is_public(policy: &str) -> Result<bool, AuditError> {
    let document: PolicyDocument = serde_json::from_str(policy)?;
    Ok(document.statements.as_slice().iter().any(|s| {
        s.effect.as_deref() == Some("Allow") && s.principal.as_ref().is_some_and(is_wildcard)
    }))
}

pub struct RepositoryPolicyCheck {
    provider: Arc<dyn CloudProvider>,
}

impl RepositoryPolicyCheck {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ResourceCheck<Repository> for RepositoryPolicyCheck {
    async fn check(&self, repository: &Repository) -> CheckOutcome {
        let Some(name) = repository.repository_name.as_deref() else {
            return CheckOutcome::skipped(repository.resource_id(), "repository has no name");
        };
        let policy = match self.provider.repository_policy(name).await {
            Ok(Some(policy)) => policy,
            Ok(None) => return CheckOutcome::skipped(name, "no repository policy"),
            Err(e) => return provider_failure(name, "get repository policy", &e),
        };
        match policy_is_public(&policy) {
            Ok(true) => CheckOutcome::fail(name, "policy allows principal '*'").with_category(PUBLIC_CATEGORY),
            Ok(false) => CheckOutcome::pass(name),
            Err(e) => provider_failure(name, "parse repository policy", &e),
        }
    }
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<RepositoriesSection>, AuditError> {
    let repositories = collect_pages("repositories", None, |cursor| ctx.provider.list_repositories(cursor)).await?;

    let batch = ctx
        .scanner(AUDIT, ctx.settings.concurrency)
        .scan(repositories, Arc::new(RepositoryPolicyCheck::new(ctx.provider.clone())))
        .await;

    let public_repositories: Vec<String> = batch
        .with_status(CheckStatus::Fail)
        .filter(|o| o.category.as_deref() == Some(PUBLIC_CATEGORY))
        .map(|o| o.resource_id.clone())
        .collect();

    let findings = public_repositories
        .iter()
        .map(|name| {
            Finding::new(AUDIT, Severity::High, FindingCategory::Exposure, "Repository is publicly accessible")
                .resource(name.as_str())
                .detail("The repository policy grants access to every principal.")
                .recommend("Scope the policy's Principal to specific accounts or roles.")
        })
        .collect();

    info!(repositories = batch.len(), public = public_repositories.len(), "ECR audit complete");
    Ok(AuditResult::new(
        RepositoriesSection {
            total_analyzed: batch.len(),
            without_policy: batch.counts().skipped,
            errors: count_provider_failures(&batch),
            public_repositories,
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    #[test]
    fn test_policy_forms() {
        assert!(policy_is_public(r#"{"Statement":[{"Effect":"Allow","Principal":"*"}]}"#).unwrap());
        assert!(policy_is_public(r#"{"Statement":[{"Effect":"Allow","Principal":{"AWS":"*"}}]}"#).unwrap());
        assert!(policy_is_public(r#"{"Statement":[{"Effect":"Allow","Principal":{"AWS":["arn:aws:iam::1:root","*"]}}]}"#).unwrap());
        assert!(!policy_is_public(r#"{"Statement":[{"Effect":"Deny","Principal":"*"}]}"#).unwrap());
        assert!(!policy_is_public(r#"{"Statement":[{"Effect":"Allow","Principal":{"AWS":"arn:aws:iam::1:root"}}]}"#).unwrap());
        assert!(policy_is_public("not json").is_err());
    }

    #[test]
    fn test_single_statement_object() {
        let policy = r#"{"Version":"2012-10-17","Statement":{"Sid":"pull","Effect":"Allow","Principal":"*","Action":"ecr:BatchGetImage"}}"#;
        assert!(policy_is_public(policy).unwrap());
        assert!(!policy_is_public(r#"{"Statement":{"Effect":"Allow","Principal":{"AWS":"arn:aws:iam::1:root"}}}"#).unwrap());
        assert!(!policy_is_public(r#"{"Version":"2012-10-17"}"#).unwrap());
    }

    #[tokio::test]
    async fn test_repository_audit() {
        let ctx = context(
            r#"
repositories:
  - repository_name: open
    policy: '{"Statement":[{"Effect":"Allow","Principal":"*","Action":["ecr:BatchGetImage"]}]}'
  - repository_name: private
    policy: { Statement: [{ Effect: Allow, Principal: { AWS: "arn:aws:iam::123456789012:root" } }] }
  - repository_name: bare
  - repository_name: garbled
    policy: "{"
  - repository_name: single
    policy: '{"Version":"2012-10-17","Statement":{"Effect":"Allow","Principal":{"AWS":"*"}}}'
"#,
        );
        let result = audit(&ctx).await.unwrap();
        assert_eq!(result.section.total_analyzed, 5);
        let mut public = result.section.public_repositories.clone();
        public.sort();
        assert_eq!(public, vec!["open", "single"]);
        assert_eq!(result.section.without_policy, 1);
        assert_eq!(result.section.errors, 1);
        assert_eq!(result.findings.len(), 2);
    }
}
