use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use super::events::{event_sink, AuditEvent};
use super::state::*;
use crate::checks::{self, AuditContext, AuditResult};
use crate::config::{AuditKind, AuditSettings};
use crate::errors::AuditError;
use crate::models::finding::{sort_findings, Finding};
use crate::models::report::{AuditFailure, AuditReport, ReportSections};
use crate::provider::CloudProvider;

/// Runs the selected audits one after another against a single provider.
///
/// An audit that fails (enumeration fault, malformed subnet data) is recorded
/// in the report's `failures` and the run moves on; only failing to identify
/// the account ends the run.
pub struct AuditOrchestrator {
    run_id: String,
    ctx: AuditContext,
    state: Arc<RwLock<RunState>>,
    event_tx: Option<mpsc::UnboundedSender<AuditEvent>>,
    findings: RwLock<Vec<Finding>>,
    failures: RwLock<Vec<AuditFailure>>,
}

impl AuditOrchestrator {
    pub fn new(provider: Arc<dyn CloudProvider>, settings: AuditSettings) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            ctx: AuditContext::new(provider, settings),
            state: Arc::new(RwLock::new(RunState::new())),
            event_tx: None,
            findings: RwLock::new(Vec::new()),
            failures: RwLock::new(Vec::new()),
        }
    }

    /// Attach an event channel; scan progress is forwarded into it as well.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<AuditEvent>) -> Self {
        self.ctx = self.ctx.with_progress(event_sink(tx.clone()));
        self.event_tx = Some(tx);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> Arc<RwLock<RunState>> {
        self.state.clone()
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    async fn update_status(&self, status: RunStatus) {
        self.state.write().await.status = status;
    }

    /// Run one audit, folding its findings or failure into the run.
    async fn run_audit<S, F>(&self, kind: AuditKind, audit: F) -> Option<S>
    where
        F: Future<Output = Result<AuditResult<S>, AuditError>>,
    {
        info!(audit = %kind, "Audit started");
        self.state.write().await.current_audit = Some(kind);
        self.emit(AuditEvent::AuditStarted { audit: kind });
        let started = Instant::now();

        let result = audit.await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(AuditResult { section, findings }) => {
                for f in &findings {
                    self.emit(AuditEvent::FindingDiscovered {
                        audit: kind,
                        title: f.title.clone(),
                        severity: f.severity,
                    });
                }
                let count = findings.len();
                self.findings.write().await.extend(findings);
                {
                    let mut state = self.state.write().await;
                    state.completed_audits.push(kind);
                    state.audit_metrics.insert(
                        kind,
                        AuditMetrics {
                            duration_ms,
                            findings: count,
                            success: true,
                        },
                    );
                }
                self.emit(AuditEvent::AuditCompleted {
                    audit: kind,
                    findings: count,
                    duration_ms,
                });
                info!(audit = %kind, findings = count, duration_ms, "Audit completed");
                Some(section)
            }
            Err(e) => {
                let class = e.classify();
                warn!(audit = %kind, error_type = class.error_type, error = %e, "Audit failed");
                self.failures.write().await.push(AuditFailure {
                    audit: kind.to_string(),
                    error_type: class.error_type.to_string(),
                    message: e.to_string(),
                });
                {
                    let mut state = self.state.write().await;
                    state.failed_audits.push(kind);
                    state.audit_metrics.insert(
                        kind,
                        AuditMetrics {
                            duration_ms,
                            findings: 0,
                            success: false,
                        },
                    );
                }
                self.emit(AuditEvent::AuditFailed {
                    audit: kind,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn compute_summary(&self) -> RunSummary {
        let findings = self.findings.read().await;
        let state = self.state.read().await;

        let mut finding_counts: HashMap<String, usize> = HashMap::new();
        for f in findings.iter() {
            *finding_counts
                .entry(format!("{:?}", f.severity).to_lowercase())
                .or_insert(0) += 1;
        }

        RunSummary {
            total_findings: findings.len(),
            finding_counts,
            audits_completed: state.completed_audits.len(),
            audits_failed: state.failed_audits.len(),
            total_duration_ms: state.elapsed_ms(),
        }
    }

    pub async fn run(&self) -> Result<AuditReport, AuditError> {
        let ctx = &self.ctx;
        self.update_status(RunStatus::Running).await;
        let provider = ctx.provider.provider_name().to_string();
        info!(run_id = %self.run_id, provider = %provider, region = %ctx.settings.region, "Audit run started");
        self.emit(AuditEvent::RunStarted {
            run_id: self.run_id.clone(),
            provider,
            region: ctx.settings.region.clone(),
            audits: ctx.settings.checks.len(),
        });

        let account = match checks::account::describe_account(ctx).await {
            Ok(account) => account,
            Err(e) => {
                error!(error = %e, "Unable to identify account");
                let mut state = self.state.write().await;
                state.status = RunStatus::Failed;
                state.error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut sections = ReportSections::default();
        for kind in ctx.settings.checks.clone() {
            match kind {
                AuditKind::Snapshots => {
                    sections.snapshots = self.run_audit(kind, checks::snapshots::audit(ctx)).await
                }
                AuditKind::SecurityGroups => {
                    sections.security_groups =
                        self.run_audit(kind, checks::security_groups::audit(ctx)).await
                }
                AuditKind::ElasticIps => {
                    sections.elastic_ips = self.run_audit(kind, checks::elastic_ips::audit(ctx)).await
                }
                AuditKind::Subnets => {
                    sections.subnets = self.run_audit(kind, checks::subnets::audit(ctx)).await
                }
                AuditKind::Volumes => {
                    sections.volumes = self.run_audit(kind, checks::volumes::audit(ctx)).await
                }
                AuditKind::Instances => {
                    sections.instances = self.run_audit(kind, checks::instances::audit(ctx)).await
                }
                AuditKind::Lambda => {
                    sections.lambda = self.run_audit(kind, checks::lambda::audit(ctx)).await
                }
                AuditKind::Rds => sections.rds = self.run_audit(kind, checks::rds::audit(ctx)).await,
                AuditKind::S3 => sections.s3 = self.run_audit(kind, checks::s3::audit(ctx)).await,
                AuditKind::Dynamodb => {
                    sections.dynamo_db = self.run_audit(kind, checks::dynamodb::audit(ctx)).await
                }
                AuditKind::Ecr => {
                    sections.repositories = self.run_audit(kind, checks::ecr::audit(ctx)).await
                }
                AuditKind::Quotas => {
                    sections.service_quotas = self.run_audit(kind, checks::quotas::audit(ctx)).await
                }
            }
        }

        let summary = self.compute_summary().await;
        {
            let mut state = self.state.write().await;
            state.current_audit = None;
            state.summary = Some(summary.clone());
            state.status = RunStatus::Completed;
        }
        self.emit(AuditEvent::RunCompleted {
            total_findings: summary.total_findings,
            failed_audits: summary.audits_failed,
            duration_ms: summary.total_duration_ms,
        });

        let mut findings = std::mem::take(&mut *self.findings.write().await);
        sort_findings(&mut findings);
        let failures = std::mem::take(&mut *self.failures.write().await);

        info!(
            run_id = %self.run_id,
            findings = findings.len(),
            failed_audits = failures.len(),
            "Audit run completed"
        );
        Ok(AuditReport {
            run_id: self.run_id.clone(),
            generated_at: Utc::now(),
            tool_version: format!("{}+{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")),
            account_information: account,
            findings,
            sections,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Inventory, InventoryProvider};

    fn orchestrator(yaml: &str, checks: Vec<AuditKind>) -> AuditOrchestrator {
        let inventory = Inventory::from_yaml(yaml).unwrap();
        let settings = AuditSettings {
            checks,
            seed: Some(7),
            ..AuditSettings::default()
        };
        let provider = InventoryProvider::new(inventory, settings.region.clone());
        AuditOrchestrator::new(Arc::new(provider), settings)
    }

    #[tokio::test]
    async fn test_failed_audit_does_not_stop_run() {
        let orch = orchestrator(
            r#"
account: { account_id: "123456789012" }
addresses: [{ public_ip: 198.51.100.7 }]
subnets: [{ subnet_id: bad, cidr_block: not-a-cidr }]
"#,
            vec![AuditKind::ElasticIps, AuditKind::Subnets],
        );
        let report = orch.run().await.unwrap();
        assert!(report.sections.elastic_ips.is_some());
        assert!(report.sections.subnets.is_none());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error_type, "MalformedPrefixError");
        assert_eq!(report.findings.len(), 1);

        let state = orch.state();
        let state = state.read().await;
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.completed_audits, vec![AuditKind::ElasticIps]);
        assert_eq!(state.failed_audits, vec![AuditKind::Subnets]);
    }

    #[tokio::test]
    async fn test_account_failure_ends_run() {
        let orch = orchestrator("faults: { account_identity: ExpiredToken }\n", vec![AuditKind::Rds]);
        assert!(orch.run().await.is_err());
        assert_eq!(orch.state().read().await.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_events_are_streamed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orch = orchestrator(
            "account: { account_id: '1' }\nsnapshots: [{ snapshot_id: s-1 }, { snapshot_id: s-2 }]\n",
            vec![AuditKind::Snapshots],
        )
        .with_event_channel(tx);
        orch.run().await.unwrap();
        drop(orch);

        let mut items = 0;
        let mut completed = false;
        let mut provider = None;
        while let Some(event) = rx.recv().await {
            match event {
                AuditEvent::RunStarted { provider: name, .. } => provider = Some(name),
                AuditEvent::ItemChecked { .. } => items += 1,
                AuditEvent::RunCompleted { .. } => completed = true,
                _ => {}
            }
        }
        assert_eq!(items, 2);
        assert!(completed);
        assert_eq!(provider.as_deref(), Some("inventory"));
    }
}
