//! Two-panel PNG report: daily engagement line plot above a keyword bar
//! chart.
//!
//! Text is rasterized through `ab_glyph`, so a TrueType font must be
//! registered before the first draw. The font comes from `chart.font_path`
//! when configured, otherwise from a short list of common system locations.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, FontTransform, register_font as register_plotters_font};

use crate::analytics::{DailyEngagement, Insights};
use crate::core::errors::{Result, TutorError};

const FONT_FAMILY: &str = "sans-serif";
const LINE_COLOR: RGBColor = RGBColor(0x2c, 0x3e, 0x50);
const CANVAS_INCHES: (f64, f64) = (12.0, 14.0);

/// Fonts probed when no font path is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub const NO_KEYWORDS: &str = "No target keywords detected.";
pub const NO_ENGAGEMENT: &str = "No engagement data recorded.";

/// Where and how to render the report.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub output: PathBuf,
    pub dpi: u32,
    pub font_path: Option<PathBuf>,
}

impl ChartOptions {
    /// Pixel size of the 12x14 inch canvas at the configured DPI.
    pub fn canvas_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let px = |inches: f64| (inches * dpi).round() as u32;
        (px(CANVAS_INCHES.0), px(CANVAS_INCHES.1))
    }

    /// Convert a point size to pixels at this DPI.
    fn pt(&self, points: f64) -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let px = (points * f64::from(self.dpi) / 72.0).round() as u32;
        px.max(1)
    }
}

/// Render the report to `options.output` and return the written path.
pub fn render_chart(insights: &Insights, options: &ChartOptions) -> Result<PathBuf> {
    ensure_font(options.font_path.as_deref())?;
    if let Some(parent) = options.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| TutorError::io(parent, e))?;
    }

    let (width, height) = options.canvas_size();
    {
        let root = BitMapBackend::new(&options.output, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;
        let panels = root.split_evenly((2, 1));
        draw_engagement(&panels[0], &insights.engagement.days, options)?;
        draw_keywords(&panels[1], &insights.keywords.descending(), options)?;
        root.present().map_err(chart_err)?;
    }

    tracing::info!(
        path = %options.output.display(),
        width,
        height,
        "analytics report written"
    );
    Ok(options.output.clone())
}

fn draw_engagement(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    days: &[DailyEngagement],
    options: &ChartOptions,
) -> Result<()> {
    let title = "Daily Student Engagement";
    if days.is_empty() {
        return draw_placeholder(area, title, NO_ENGAGEMENT, options);
    }

    let peak = days.iter().map(|d| d.total_minutes).fold(0.0_f64, f64::max);
    let y_top = if peak > 0.0 { peak * 1.15 } else { 1.0 };
    let last = (days.len() - 1) as f64;
    let labels: Vec<String> = days.iter().map(|d| d.date.format("%b %d").to_string()).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT_FAMILY, options.pt(20.0)))
        .margin(options.pt(12.0))
        .x_label_area_size(options.pt(40.0))
        .y_label_area_size(options.pt(50.0))
        .build_cartesian_2d(-0.5_f64..last + 0.5, 0.0_f64..y_top)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(days.len())
        .x_label_formatter(&|x| index_label(*x, &labels))
        .x_desc("Session Date")
        .y_desc("Total Minutes")
        .label_style((FONT_FAMILY, options.pt(11.0)))
        .axis_desc_style((FONT_FAMILY, options.pt(16.0)))
        .draw()
        .map_err(chart_err)?;

    let points: Vec<(f64, f64)> = days
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, d.total_minutes))
        .collect();
    chart
        .draw_series(LineSeries::new(
            points.iter().copied(),
            LINE_COLOR.stroke_width(options.pt(3.0)),
        ))
        .map_err(chart_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&p| Circle::new(p, options.pt(5.0), LINE_COLOR.filled())),
        )
        .map_err(chart_err)?;
    Ok(())
}

fn draw_keywords(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    ranked: &[(&str, u64)],
    options: &ChartOptions,
) -> Result<()> {
    let title = "Cumulative Concept Engagement";
    if ranked.is_empty() {
        return draw_placeholder(area, title, NO_KEYWORDS, options);
    }

    let peak = ranked.iter().map(|(_, n)| *n).max().unwrap_or(1) as f64;
    let last = (ranked.len() - 1) as f64;
    let labels: Vec<String> = ranked.iter().map(|(k, _)| (*k).to_string()).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT_FAMILY, options.pt(20.0)))
        .margin(options.pt(12.0))
        .x_label_area_size(options.pt(90.0))
        .y_label_area_size(options.pt(50.0))
        .build_cartesian_2d(-0.5_f64..last + 0.5, 0.0_f64..peak * 1.15)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(ranked.len())
        .x_label_formatter(&|x| index_label(*x, &labels))
        .x_label_style(
            TextStyle::from((FONT_FAMILY, options.pt(11.0)).into_font())
                .transform(FontTransform::Rotate90),
        )
        .y_label_style((FONT_FAMILY, options.pt(11.0)))
        .x_desc("Python Concept")
        .y_desc("Total Student Mentions")
        .axis_desc_style((FONT_FAMILY, options.pt(16.0)))
        .draw()
        .map_err(chart_err)?;

    let count = ranked.len();
    chart
        .draw_series(ranked.iter().enumerate().map(|(i, (_, n))| {
            let x = i as f64;
            Rectangle::new(
                [(x - 0.4, 0.0), (x + 0.4, *n as f64)],
                bar_color(i, count).filled(),
            )
        }))
        .map_err(chart_err)?;
    Ok(())
}

fn draw_placeholder(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    title: &str,
    message: &str,
    options: &ChartOptions,
) -> Result<()> {
    let body = area
        .titled(title, (FONT_FAMILY, options.pt(20.0)))
        .map_err(chart_err)?;
    let (w, h) = body.dim_in_pixel();
    let style = TextStyle::from((FONT_FAMILY, options.pt(14.0)).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));
    #[allow(clippy::cast_possible_wrap)]
    let center = ((w / 2) as i32, (h / 2) as i32);
    body.draw(&Text::new(message, center, style))
        .map_err(chart_err)?;
    Ok(())
}

/// Tick label for an integer x position, blank between categories.
fn index_label(x: f64, labels: &[String]) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// Dark blue through green to yellow across the bars.
fn bar_color(index: usize, count: usize) -> HSLColor {
    let t = if count > 1 {
        index as f64 / (count - 1) as f64
    } else {
        0.0
    };
    HSLColor(0.72 - 0.55 * t, 0.65, 0.30 + 0.25 * t)
}

fn chart_err<E: std::fmt::Display>(err: E) -> TutorError {
    TutorError::Chart {
        details: err.to_string(),
    }
}

// ──────────────────── fonts ────────────────────

static FONT_REGISTRATION: OnceLock<std::result::Result<PathBuf, String>> = OnceLock::new();

/// Register the report font once per process.
fn ensure_font(configured: Option<&Path>) -> Result<()> {
    let outcome = FONT_REGISTRATION.get_or_init(|| register_font(configured));
    match outcome {
        Ok(path) => {
            tracing::debug!(font = %path.display(), "chart font registered");
            Ok(())
        }
        Err(details) => Err(TutorError::Chart {
            details: details.clone(),
        }),
    }
}

fn register_font(configured: Option<&Path>) -> std::result::Result<PathBuf, String> {
    let path = match configured {
        Some(path) => path.to_path_buf(),
        None => find_system_font().ok_or_else(|| {
            "no TrueType font found; set chart.font_path or TUTOR_CHART_FONT".to_string()
        })?,
    };
    let bytes = fs::read(&path).map_err(|e| format!("cannot read font {}: {e}", path.display()))?;
    // Registered fonts must be 'static; this runs at most once.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_plotters_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| format!("invalid font {}", path.display()))?;
    Ok(path)
}

/// First font from the built-in probe list that exists on this machine.
pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONTS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Show the image with the platform's default viewer without waiting for it.
pub fn open_image(path: &Path) -> Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    command
        .arg(path)
        .spawn()
        .map_err(|e| TutorError::Runtime {
            details: format!("failed to open {}: {e}", path.display()),
        })?;
    Ok(())
}
