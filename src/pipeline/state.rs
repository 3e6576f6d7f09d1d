use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AuditKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    pub current_audit: Option<AuditKind>,
    pub completed_audits: Vec<AuditKind>,
    pub failed_audits: Vec<AuditKind>,
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    pub audit_metrics: HashMap<AuditKind, AuditMetrics>,
    pub summary: Option<RunSummary>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Queued,
            current_audit: None,
            completed_audits: Vec::new(),
            failed_audits: Vec::new(),
            error: None,
            start_time: Utc::now(),
            audit_metrics: HashMap::new(),
            summary: None,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        Utc::now()
            .signed_duration_since(self.start_time)
            .num_milliseconds()
            .unsigned_abs()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditMetrics {
    pub duration_ms: u64,
    pub findings: usize,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_findings: usize,
    /// Findings per severity name.
    pub finding_counts: HashMap<String, usize>,
    pub audits_completed: usize,
    pub audits_failed: usize,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_queued() {
        let state = RunState::new();
        assert_eq!(state.status, RunStatus::Queued);
        assert!(state.current_audit.is_none());
        assert!(state.summary.is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&RunStatus::Running).unwrap(), "\"running\"");
    }
}
