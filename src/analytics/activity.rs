//! Recent-activity window and summary scalars.

#![allow(missing_docs)]

use serde::Serialize;

use crate::history::record::InteractionRecord;

/// Widest display bar, in cells.
pub const MAX_BAR_WIDTH: usize = 30;
/// Response length that fills the whole bar.
pub const LONG_RESPONSE_CHARS: u64 = 2000;

/// One row of the recent-activity view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityBar {
    pub query: String,
    pub response_length: u64,
    pub bar_len: usize,
}

/// `min(floor(len / 2000 * 30), 30)` in integer arithmetic.
pub fn activity_bar_len(response_length: u64) -> usize {
    let clamped = response_length.min(LONG_RESPONSE_CHARS);
    // clamped * 30 / 2000 never exceeds 30, so the cast is lossless.
    (clamped * MAX_BAR_WIDTH as u64 / LONG_RESPONSE_CHARS) as usize
}

/// The last `k` records in file order, each with its display bar.
pub fn recent_activity(records: &[InteractionRecord], k: usize) -> Vec<ActivityBar> {
    let start = records.len().saturating_sub(k);
    records[start..]
        .iter()
        .map(|r| ActivityBar {
            query: r.query().to_string(),
            response_length: r.response_length(),
            bar_len: activity_bar_len(r.response_length()),
        })
        .collect()
}

/// Whole-log scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_queries: usize,
    /// `None` when there are no records.
    pub mean_response_length: Option<f64>,
}

pub fn summarize(records: &[InteractionRecord]) -> HistorySummary {
    let total_queries = records.len();
    let mean_response_length = (total_queries > 0).then(|| {
        let sum: u64 = records.iter().map(InteractionRecord::response_length).sum();
        sum as f64 / total_queries as f64
    });
    HistorySummary {
        total_queries,
        mean_response_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(query: &str, response_len: usize) -> InteractionRecord {
        InteractionRecord::new(query, "x".repeat(response_len), "m", None)
    }

    #[test]
    fn bar_scaling_reference_points() {
        assert_eq!(activity_bar_len(0), 0);
        assert_eq!(activity_bar_len(66), 0);
        assert_eq!(activity_bar_len(67), 1);
        assert_eq!(activity_bar_len(1000), 15);
        assert_eq!(activity_bar_len(1999), 29);
        assert_eq!(activity_bar_len(2000), 30);
        assert_eq!(activity_bar_len(4000), 30);
        assert_eq!(activity_bar_len(u64::MAX), 30);
    }

    #[test]
    fn recent_window_keeps_last_k_in_order() {
        let records: Vec<_> = (0..7).map(|i| record(&format!("q{i}"), i * 100)).collect();
        let recent = recent_activity(&records, 3);
        let queries: Vec<&str> = recent.iter().map(|a| a.query.as_str()).collect();
        assert_eq!(queries, ["q4", "q5", "q6"]);
        assert_eq!(recent[2].response_length, 600);
        assert_eq!(recent[2].bar_len, 9);
    }

    #[test]
    fn recent_window_larger_than_history_returns_everything() {
        let records = [record("only", 10)];
        assert_eq!(recent_activity(&records, 5).len(), 1);
        assert!(recent_activity(&[], 5).is_empty());
        assert!(recent_activity(&records, 0).is_empty());
    }

    #[test]
    fn summary_of_empty_history_has_no_mean() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_queries, 0);
        assert_eq!(summary.mean_response_length, None);
    }

    #[test]
    fn summary_mean_is_arithmetic_mean() {
        let summary = summarize(&[record("a", 10), record("b", 20), record("c", 0)]);
        assert_eq!(summary.total_queries, 3);
        assert_eq!(summary.mean_response_length, Some(10.0));
    }

    proptest! {
        #[test]
        fn bar_is_bounded_and_monotonic(a in 0u64..10_000, b in 0u64..10_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(activity_bar_len(hi) <= MAX_BAR_WIDTH);
            prop_assert!(activity_bar_len(lo) <= activity_bar_len(hi));
        }
    }
}
