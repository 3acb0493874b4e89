#![forbid(unsafe_code)]

//! Python Tutor: a personal tutoring assistant backed by a hosted language
//! model, with an append-only interaction log that repairs itself and usage
//! analytics computed from it.
//!
//! Pipeline:
//! 1. **History**: every exchange is appended as one JSON line; a validation
//!    pass drops malformed lines into a `_cleaned` copy
//! 2. **Analytics**: daily engagement, whole-word keyword counts, recent
//!    activity, summary scalars
//! 3. **Report**: a console summary and a two-panel PNG chart
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use python_tutor::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use python_tutor::history::{scan_history, validate_and_repair};
//! use python_tutor::analytics::{Insights, KeywordVocabulary};
//! ```

pub mod prelude;

pub mod analytics;
pub mod core;
pub mod history;
pub mod report;
pub mod tutor;
