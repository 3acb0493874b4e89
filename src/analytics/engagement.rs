//! Per-day engagement totals.
//!
//! Each record carries "minutes since session start" at the time it was
//! logged, and the totals sum those values per calendar date. Several
//! records from one session therefore over-count that session; the sum is
//! kept unconditional so totals stay comparable with earlier reports.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::history::record::InteractionRecord;

/// Total logged minutes for one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyEngagement {
    pub date: NaiveDate,
    pub total_minutes: f64,
}

/// Daily totals in ascending date order, plus how many records had a
/// timestamp that could not be read as a date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementSeries {
    pub days: Vec<DailyEngagement>,
    pub skipped: usize,
}

impl EngagementSeries {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Group records by calendar date and sum `session_duration` (missing
/// counts as zero).
pub fn daily_engagement(records: &[InteractionRecord]) -> EngagementSeries {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut skipped = 0;

    for record in records {
        let Some(date) = record.date() else {
            tracing::debug!(
                timestamp = record.timestamp(),
                "skipping record with unreadable timestamp"
            );
            skipped += 1;
            continue;
        };
        *totals.entry(date).or_insert(0.0) += record.session_duration().unwrap_or(0.0);
    }

    EngagementSeries {
        days: totals
            .into_iter()
            .map(|(date, total_minutes)| DailyEngagement { date, total_minutes })
            .collect(),
        skipped,
    }
}
