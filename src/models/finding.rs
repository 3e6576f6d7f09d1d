use serde::{Deserialize, Serialize};

/// Severity level for a finding, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Returns a numeric rank where lower values indicate higher severity.
    /// Critical = 0, High = 1, Medium = 2, Low = 3, Info = 4.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Info => 4,
        }
    }

    /// Status glyph used in text output.
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Critical | Severity::High => "❌",
            Severity::Medium | Severity::Low => "⚠️",
            Severity::Info => "ℹ️",
        }
    }
}

/// Area of the account a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCategory {
    Exposure,
    NetworkHygiene,
    CostWaste,
    Lifecycle,
    Resilience,
    Encryption,
    Capacity,
}

/// A single audit finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub severity: Severity,
    pub category: FindingCategory,
    /// Audit that produced this finding (e.g. "snapshots").
    pub audit: String,
    pub resource_id: Option<String>,
    pub detail: String,
    pub recommendation: String,
}

impl Finding {
    pub fn new(
        audit: &str,
        severity: Severity,
        category: FindingCategory,
        title: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            severity,
            category,
            audit: audit.to_string(),
            resource_id: None,
            detail: String::new(),
            recommendation: String::new(),
        }
    }

    pub fn resource(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }
}

/// Sort findings most severe first, then by audit and resource.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| a.audit.cmp(&b.audit))
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });
}
