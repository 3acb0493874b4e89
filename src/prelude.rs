//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use python_tutor::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, TutorError};

// History
pub use crate::history::{
    HistoryWriter, InteractionRecord, RepairOutcome, repair_history, scan_history,
    validate_and_repair,
};

// Analytics
pub use crate::analytics::{
    Insights, KeywordCounts, KeywordVocabulary, count_keywords, daily_engagement,
    recent_activity, summarize,
};

// Report
#[cfg(feature = "chart")]
pub use crate::report::{ChartOptions, render_chart};
pub use crate::report::render_text_summary;

// Tutor
pub use crate::tutor::{GeminiClient, Responder, RetryPolicy, TutorSession, Turn};
