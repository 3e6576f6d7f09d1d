use tracing::info;

use super::{AuditContext, AuditResult};
use crate::engine::{collect_pages, UNKNOWN_RESOURCE_ID};
use crate::errors::AuditError;
use crate::models::finding::{Finding, FindingCategory, Severity};
use crate::models::report::{DbInstanceReport, RdsSection};
use crate::models::resources::DbInstance;

const AUDIT: &str = "rds";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbIssue {
    PubliclyAccessible,
    Unencrypted,
    Gp2Storage,
    SingleAz,
    NoBackups,
}

impl DbIssue {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PubliclyAccessible => "Publicly accessible",
            Self::Unencrypted => "Storage encryption not enabled",
            Self::Gp2Storage => "Using gp2 storage",
            Self::SingleAz => "Multi-AZ not enabled",
            Self::NoBackups => "Backup retention not enabled",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::PubliclyAccessible => Severity::Critical,
            Self::Unencrypted | Self::NoBackups => Severity::High,
            Self::SingleAz => Severity::Medium,
            Self::Gp2Storage => Severity::Low,
        }
    }

    fn category(&self) -> FindingCategory {
        match self {
            Self::PubliclyAccessible => FindingCategory::Exposure,
            Self::Unencrypted => FindingCategory::Encryption,
            Self::Gp2Storage => FindingCategory::CostWaste,
            Self::SingleAz | Self::NoBackups => FindingCategory::Resilience,
        }
    }

    fn recommendation(&self) -> &'static str {
        match self {
            Self::PubliclyAccessible => "Disable public accessibility and reach the database through private networking.",
            Self::Unencrypted => "Restore from an encrypted snapshot copy to enable encryption at rest.",
            Self::Gp2Storage => "Migrate the storage to gp3.",
            Self::SingleAz => "Enable Multi-AZ for production databases.",
            Self::NoBackups => "Set a backup retention period of at least 7 days.",
        }
    }
}

/// Posture issues of one instance. Public access and encryption are only
/// flagged when reported; an absent Multi-AZ or retention value is treated
/// as disabled.
pub fn evaluate(db: &DbInstance) -> Vec<DbIssue> {
    let mut issues = Vec::new();
    if db.publicly_accessible == Some(true) {
        issues.push(DbIssue::PubliclyAccessible);
    }
    if db.storage_encrypted == Some(false) {
        issues.push(DbIssue::Unencrypted);
    }
    if db.storage_type.as_deref() == Some("gp2") {
        issues.push(DbIssue::Gp2Storage);
    }
    if db.multi_az != Some(true) {
        issues.push(DbIssue::SingleAz);
    }
    if !db.backup_retention_days.is_some_and(|days| days > 0) {
        issues.push(DbIssue::NoBackups);
    }
    issues
}

pub async fn audit(ctx: &AuditContext) -> Result<AuditResult<RdsSection>, AuditError> {
    let instances = collect_pages(AUDIT, None, |cursor| ctx.provider.list_db_instances(cursor)).await?;

    let mut findings = Vec::new();
    let mut reports = Vec::with_capacity(instances.len());
    for db in &instances {
        let identifier = db
            .identifier
            .clone()
            .unwrap_or_else(|| UNKNOWN_RESOURCE_ID.to_string());
        let issues = evaluate(db);
        for issue in &issues {
            findings.push(
                Finding::new(AUDIT, issue.severity(), issue.category(), issue.label())
                    .resource(identifier.as_str())
                    .recommend(issue.recommendation()),
            );
        }
        reports.push(DbInstanceReport {
            identifier,
            issues: issues.iter().map(|i| i.label().to_string()).collect(),
            backup_retention_days: db.backup_retention_days,
        });
    }

    info!(instances = instances.len(), findings = findings.len(), "RDS audit complete");
    Ok(AuditResult::new(
        RdsSection {
            total_analyzed: instances.len(),
            instances: reports,
        },
        findings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::context;

    #[test]
    fn test_well_configured_instance() {
        let db = DbInstance {
            identifier: Some("db".into()),
            publicly_accessible: Some(false),
            storage_encrypted: Some(true),
            storage_type: Some("gp3".into()),
            multi_az: Some(true),
            backup_retention_days: Some(7),
        };
        assert!(evaluate(&db).is_empty());
    }

    #[test]
    fn test_absent_fields_policy() {
        let issues = evaluate(&DbInstance::default());
        assert_eq!(issues, vec![DbIssue::SingleAz, DbIssue::NoBackups]);
    }

    #[tokio::test]
    async fn test_audit_reports_each_issue() {
        let ctx = context(
            r#"
db_instances:
  - identifier: legacy
    publicly_accessible: true
    storage_encrypted: false
    storage_type: gp2
    multi_az: false
    backup_retention_days: 0
"#,
        );
        let result = audit(&ctx).await.unwrap();
        assert_eq!(result.section.instances[0].issues.len(), 5);
        assert_eq!(result.findings.len(), 5);
    }
}
