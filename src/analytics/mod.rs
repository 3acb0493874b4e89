//! Aggregation over validated history records.
//!
//! Everything here is a pure function of the records passed in; nothing
//! reads the log or caches state between calls.

#![allow(missing_docs)]

pub mod activity;
pub mod engagement;
pub mod keywords;

pub use activity::{
    ActivityBar, HistorySummary, LONG_RESPONSE_CHARS, MAX_BAR_WIDTH, activity_bar_len,
    recent_activity, summarize,
};
pub use engagement::{DailyEngagement, EngagementSeries, daily_engagement};
pub use keywords::{DEFAULT_KEYWORDS, KeywordCounts, KeywordVocabulary, count_keywords};

use crate::history::record::InteractionRecord;

/// Default number of keywords in rankings.
pub const DEFAULT_TOP_N: usize = 5;
/// Default size of the recent-activity window.
pub const DEFAULT_RECENT_K: usize = 5;

// ──────────────────── bundled view ────────────────────

/// Everything the reporters need, computed in one pass over the records.
#[derive(Debug, Clone)]
pub struct Insights {
    pub summary: HistorySummary,
    pub engagement: EngagementSeries,
    pub keywords: KeywordCounts,
    pub top_n: usize,
    pub recent: Vec<ActivityBar>,
}

impl Insights {
    pub fn compute(
        records: &[InteractionRecord],
        vocabulary: &KeywordVocabulary,
        top_n: usize,
        recent_k: usize,
    ) -> Self {
        let insights = Self {
            summary: summarize(records),
            engagement: daily_engagement(records),
            keywords: count_keywords(records, vocabulary),
            top_n,
            recent: recent_activity(records, recent_k),
        };
        tracing::debug!(
            records = insights.summary.total_queries,
            days = insights.engagement.days.len(),
            keywords = insights.keywords.len(),
            "computed history insights"
        );
        insights
    }

    pub fn top_keywords(&self) -> Vec<(&str, u64)> {
        self.keywords.top(self.top_n)
    }

    pub fn is_empty(&self) -> bool {
        self.summary.total_queries == 0
    }

    /// Machine-readable form for `--json` output.
    pub fn to_json(&self) -> serde_json::Value {
        let top: Vec<serde_json::Value> = self
            .top_keywords()
            .into_iter()
            .map(|(keyword, count)| serde_json::json!({"keyword": keyword, "count": count}))
            .collect();
        let all: serde_json::Map<String, serde_json::Value> = self
            .keywords
            .iter()
            .map(|(k, n)| (k.to_string(), serde_json::Value::from(n)))
            .collect();
        let daily: Vec<serde_json::Value> = self
            .engagement
            .days
            .iter()
            .map(|d| {
                serde_json::json!({
                    "date": d.date.format("%Y-%m-%d").to_string(),
                    "total_minutes": d.total_minutes,
                })
            })
            .collect();

        serde_json::json!({
            "total_queries": self.summary.total_queries,
            "mean_response_length": self.summary.mean_response_length,
            "daily_engagement": daily,
            "undated_records": self.engagement.skipped,
            "keyword_counts": all,
            "top_keywords": top,
            "recent_activity": self.recent,
        })
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<InteractionRecord> {
        [
            r#"{"timestamp":"2024-01-01T10:00:00","query":"what is a tuple","response":"A tuple is...","response_length":13,"model":"m1","session_duration":1.5}"#,
            r#"{"timestamp":"2024-01-01T10:04:00","query":"tuple unpacking?","response":"","response_length":0,"model":"m1","session_duration":4.0}"#,
            r#"{"timestamp":"2024-01-02T08:00:00","query":"and a list","response":"...","response_length":2500,"model":"m1"}"#,
        ]
        .iter()
        .map(|l| InteractionRecord::from_line(l).unwrap())
        .collect()
    }

    #[test]
    fn compute_bundles_every_view() {
        let vocab = KeywordVocabulary::new(["tuple", "unpacking", "list"]).unwrap();
        let insights = Insights::compute(&records(), &vocab, 2, 2);

        assert_eq!(insights.summary.total_queries, 3);
        assert_eq!(insights.summary.mean_response_length, Some(2513.0 / 3.0));
        assert_eq!(insights.engagement.days.len(), 2);
        assert!((insights.engagement.days[0].total_minutes - 5.5).abs() < f64::EPSILON);
        assert_eq!(insights.top_keywords(), [("tuple", 2), ("unpacking", 1)]);
        assert_eq!(insights.recent.len(), 2);
        assert_eq!(insights.recent[1].bar_len, MAX_BAR_WIDTH);
    }

    #[test]
    fn empty_history_computes_placeholders() {
        let insights = Insights::compute(&[], &KeywordVocabulary::builtin().unwrap(), 5, 5);
        assert!(insights.is_empty());
        assert!(insights.summary.mean_response_length.is_none());
        assert!(insights.top_keywords().is_empty());
        assert!(insights.recent.is_empty());
    }

    #[test]
    fn json_export_well_formed() {
        let vocab = KeywordVocabulary::new(["tuple", "list"]).unwrap();
        let json = Insights::compute(&records(), &vocab, 5, 5).to_json();

        assert_eq!(json["total_queries"], 3);
        assert_eq!(json["daily_engagement"][0]["date"], "2024-01-01");
        assert_eq!(json["daily_engagement"][1]["total_minutes"], 0.0);
        assert_eq!(json["keyword_counts"]["tuple"], 2);
        assert_eq!(json["top_keywords"][0]["keyword"], "tuple");
        assert_eq!(json["recent_activity"][2]["bar_len"], 30);
        assert_eq!(json["undated_records"], 0);

        let empty = Insights::compute(&[], &vocab, 5, 5).to_json();
        assert!(empty["mean_response_length"].is_null());
    }
}
