//! Reduction of outcomes and raw counts into percentage distributions.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::outcome::{CheckOutcome, ScanBatch};

const BAR_GLYPH: char = '█';

/// One category's share of a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub category: String,
    pub count: usize,
    pub percentage: f64,
}

/// Merge `(category, count)` pairs and compute each category's share.
///
/// Repeated categories are summed. Entries are ordered by percentage
/// descending, then by category name. A zero total yields no entries.
pub fn distribution<I, S>(counts: I) -> Vec<DistributionEntry>
where
    I: IntoIterator<Item = (S, usize)>,
    S: Into<String>,
{
    let mut merged: BTreeMap<String, usize> = BTreeMap::new();
    for (category, count) in counts {
        *merged.entry(category.into()).or_insert(0) += count;
    }

    let total: usize = merged.values().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut entries: Vec<DistributionEntry> = merged
        .into_iter()
        .map(|(category, count)| DistributionEntry {
            percentage: 100.0 * count as f64 / total as f64,
            category,
            count,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    entries
}

/// Distribution of the evaluated outcomes in a batch, keyed by `key`.
///
/// Skipped outcomes and outcomes for which `key` returns `None` are not counted.
pub fn aggregate_by<F>(batch: &ScanBatch, key: F) -> Vec<DistributionEntry>
where
    F: Fn(&CheckOutcome) -> Option<String>,
{
    distribution(
        batch
            .iter()
            .filter(|o| !o.is_skipped())
            .filter_map(|o| key(o).map(|k| (k, 1))),
    )
}

/// Distribution of evaluated outcomes by their category, falling back to status.
pub fn aggregate(batch: &ScanBatch) -> Vec<DistributionEntry> {
    aggregate_by(batch, |o| {
        Some(o.category.clone().unwrap_or_else(|| o.status.as_str().to_string()))
    })
}

/// Share of `total` items lacking some property; `None` when `total` is zero.
pub fn presence_percentage(without: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(100.0 * without as f64 / total as f64)
}

/// Width of a bar for `percentage`, clamped to `[0, max_width]`.
pub fn bar_width(percentage: f64, max_width: usize) -> usize {
    if !percentage.is_finite() {
        return 0;
    }
    let width = (max_width as f64 * percentage / 100.0).round();
    width.clamp(0.0, max_width as f64) as usize
}

pub fn render_bar(percentage: f64, max_width: usize) -> String {
    std::iter::repeat(BAR_GLYPH)
        .take(bar_width(percentage, max_width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_merges_and_sorts() {
        let entries = distribution([("m5.large", 6), ("t3.micro", 3), ("t3.micro", 1)]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, "m5.large");
        assert_eq!(entries[0].count, 6);
        assert!((entries[0].percentage - 60.0).abs() < 1e-9);
        assert_eq!(entries[1].category, "t3.micro");
        assert!((entries[1].percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_ties_sorted_by_name() {
        let entries = distribution([("b", 2), ("a", 2), ("c", 1)]);
        let names: Vec<_> = entries.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_distribution_zero_total_is_empty() {
        assert!(distribution(Vec::<(String, usize)>::new()).is_empty());
        assert!(distribution([("spot", 0)]).is_empty());
    }

    #[test]
    fn test_aggregate_excludes_skipped() {
        let batch = ScanBatch::from_outcomes(vec![
            CheckOutcome::pass("t1").with_category("provisioned"),
            CheckOutcome::pass("t2").with_category("on-demand"),
            CheckOutcome::pass("t3").with_category("on-demand"),
            CheckOutcome::skipped("t4", "no throughput"),
        ]);
        let entries = aggregate(&batch);
        let total: usize = entries.iter().map(|e| e.count).sum();
        assert_eq!(total, 3);
        assert_eq!(entries[0].category, "on-demand");
    }

    #[test]
    fn test_aggregate_empty_batch() {
        assert!(aggregate(&ScanBatch::default()).is_empty());
    }

    #[test]
    fn test_aggregate_falls_back_to_status() {
        let batch = ScanBatch::from_outcomes(vec![
            CheckOutcome::pass("a"),
            CheckOutcome::fail("b", "x"),
        ]);
        let entries = aggregate(&batch);
        assert_eq!(entries[0].category, "fail");
        assert_eq!(entries[1].category, "pass");
    }

    #[test]
    fn test_presence_percentage() {
        assert_eq!(presence_percentage(0, 0), None);
        assert_eq!(presence_percentage(1, 4), Some(25.0));
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(60.0, 15).chars().count(), 9);
        assert_eq!(render_bar(0.0, 15), "");
        assert_eq!(render_bar(100.0, 15).chars().count(), 15);
        assert_eq!(render_bar(250.0, 10).chars().count(), 10);
        assert_eq!(render_bar(-5.0, 10), "");
        assert_eq!(render_bar(f64::NAN, 10), "");
    }
}
