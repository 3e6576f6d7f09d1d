use serde::{Deserialize, Serialize};

/// Placeholder id for descriptors whose provider record carried no identifier.
pub const UNKNOWN_RESOURCE_ID: &str = "<unknown>";

/// Anything the scanner can dispatch a check against.
pub trait Resource: Send + Sync + 'static {
    fn resource_id(&self) -> &str;
}

impl Resource for String {
    fn resource_id(&self) -> &str {
        self
    }
}

/// Result class of one per-resource check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    /// The resource was ineligible for evaluation (too young, wrong region, ...).
    Skipped,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single outcome produced for one resource by a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub resource_id: String,
    pub status: CheckStatus,
    /// Numeric observation, e.g. average CPU percentage.
    pub metric: Option<f64>,
    /// Human-readable reason for a failure or skip.
    pub detail: Option<String>,
    /// Bucket used when the batch is reduced to a distribution.
    pub category: Option<String>,
}

impl CheckOutcome {
    fn new(resource_id: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            resource_id: resource_id.into(),
            status,
            metric: None,
            detail: None,
            category: None,
        }
    }

    pub fn pass(resource_id: impl Into<String>) -> Self {
        Self::new(resource_id, CheckStatus::Pass)
    }

    pub fn fail(resource_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(resource_id, CheckStatus::Fail).with_detail(detail)
    }

    pub fn skipped(resource_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(resource_id, CheckStatus::Skipped).with_detail(reason)
    }

    pub fn with_metric(mut self, metric: f64) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.status == CheckStatus::Skipped
    }
}

/// Pass/fail/skip tallies for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchCounts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Resources that were actually evaluated.
    pub fn processed(&self) -> usize {
        self.passed + self.failed
    }
}

/// Complete, immutable set of outcomes from one scanner invocation.
///
/// Outcomes arrive in no particular order; consumers must not rely on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanBatch {
    outcomes: Vec<CheckOutcome>,
}

impl ScanBatch {
    pub(crate) fn from_outcomes(outcomes: Vec<CheckOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter()
    }

    pub fn with_status(&self, status: CheckStatus) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(move |o| o.status == status)
    }

    pub fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts::default();
        for outcome in &self.outcomes {
            match outcome.status {
                CheckStatus::Pass => counts.passed += 1,
                CheckStatus::Fail => counts.failed += 1,
                CheckStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }
}

impl IntoIterator for ScanBatch {
    type Item = CheckOutcome;
    type IntoIter = std::vec::IntoIter<CheckOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_builders() {
        let o = CheckOutcome::fail("i-1", "cpu below threshold").with_metric(4.5);
        assert_eq!(o.status, CheckStatus::Fail);
        assert_eq!(o.metric, Some(4.5));
        assert_eq!(o.detail.as_deref(), Some("cpu below threshold"));

        let s = CheckOutcome::skipped("i-2", "launched recently");
        assert!(s.is_skipped());
        assert!(s.metric.is_none());
    }

    #[test]
    fn test_batch_counts() {
        let batch = ScanBatch::from_outcomes(vec![
            CheckOutcome::pass("a"),
            CheckOutcome::pass("b"),
            CheckOutcome::fail("c", "x"),
            CheckOutcome::skipped("d", "y"),
        ]);
        let counts = batch.counts();
        assert_eq!(counts.passed, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.total(), batch.len());
        assert_eq!(counts.processed(), 3);
        assert_eq!(batch.with_status(CheckStatus::Fail).count(), 1);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CheckStatus::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
    }
}
