use tokio::sync::mpsc::UnboundedSender;

use crate::config::AuditKind;
use crate::engine::{CheckStatus, ProgressSink, ScanEvent};
use crate::models::finding::Severity;

/// Messages streamed from a run to a progress display or other consumer.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    RunStarted {
        run_id: String,
        provider: String,
        region: String,
        audits: usize,
    },
    AuditStarted {
        audit: AuditKind,
    },
    /// A bounded scan began dispatching checks
    ScanStarted {
        label: String,
        total: usize,
    },
    ItemChecked {
        label: String,
        resource_id: String,
        status: CheckStatus,
    },
    ScanFinished {
        label: String,
        passed: usize,
        failed: usize,
        skipped: usize,
    },
    FindingDiscovered {
        audit: AuditKind,
        title: String,
        severity: Severity,
    },
    AuditCompleted {
        audit: AuditKind,
        findings: usize,
        duration_ms: u64,
    },
    AuditFailed {
        audit: AuditKind,
        error: String,
    },
    RunCompleted {
        total_findings: usize,
        failed_audits: usize,
        duration_ms: u64,
    },
}

impl From<ScanEvent> for AuditEvent {
    fn from(event: ScanEvent) -> Self {
        match event {
            ScanEvent::Started { label, total } => AuditEvent::ScanStarted { label, total },
            ScanEvent::ItemCompleted {
                label,
                resource_id,
                status,
            } => AuditEvent::ItemChecked {
                label,
                resource_id,
                status,
            },
            ScanEvent::Finished {
                label,
                passed,
                failed,
                skipped,
            } => AuditEvent::ScanFinished {
                label,
                passed,
                failed,
                skipped,
            },
        }
    }
}

/// Forward scanner progress into an event channel. A closed channel is ignored.
pub fn event_sink(tx: UnboundedSender<AuditEvent>) -> ProgressSink {
    std::sync::Arc::new(move |event: ScanEvent| {
        let _ = tx.send(event.into());
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_forwards_scan_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = event_sink(tx);
        sink(ScanEvent::Started {
            label: "s3".into(),
            total: 4,
        });
        match rx.try_recv().unwrap() {
            AuditEvent::ScanStarted { label, total } => {
                assert_eq!(label, "s3");
                assert_eq!(total, 4);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_sink_survives_closed_channel() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let sink = event_sink(tx);
        sink(ScanEvent::Finished {
            label: "x".into(),
            passed: 0,
            failed: 0,
            skipped: 0,
        });
    }
}
