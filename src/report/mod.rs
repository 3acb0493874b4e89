//! Presentation of aggregated insights: a console summary and, with the
//! `chart` feature, a PNG report.

#[cfg(feature = "chart")]
pub mod chart;
pub mod text;

#[cfg(feature = "chart")]
pub use chart::{ChartOptions, open_image, render_chart};
pub use text::render_text_summary;
