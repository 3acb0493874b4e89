//! Console summary printed at the end of every session and by `tutor stats`.

use std::io::{self, Write};

use crate::analytics::{Insights, MAX_BAR_WIDTH};

const RULE_WIDTH: usize = 50;
const LABEL_WIDTH: usize = 12;
const MENTION_GLYPH: char = '●';
const ACTIVITY_GLYPH: char = '█';

/// Placeholder printed instead of a mean when there are no records.
pub const NO_DATA: &str = "n/a (no data)";

/// Write the cumulative summary to `out`.
///
/// `session_minutes` is the length of the session that just ended (zero when
/// the summary is requested outside a session).
pub fn render_text_summary<W: Write>(
    out: &mut W,
    insights: &Insights,
    session_minutes: f64,
) -> io::Result<()> {
    let heavy = "=".repeat(RULE_WIDTH);
    writeln!(out)?;
    writeln!(out, "{heavy}")?;
    writeln!(out, "      CUMULATIVE TUTORING INSIGHTS")?;
    writeln!(out, "{heavy}")?;
    writeln!(out, "Session Duration:  {session_minutes:?} minutes")?;
    writeln!(out, "Total Queries:     {}", insights.summary.total_queries)?;
    match insights.summary.mean_response_length {
        Some(mean) => writeln!(out, "Avg Tutor Length:  {mean:.1} chars")?,
        None => writeln!(out, "Avg Tutor Length:  {NO_DATA}")?,
    }
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

    writeln!(out, "Top Student Concepts (Total Count):")?;
    let top = insights.top_keywords();
    if top.is_empty() {
        writeln!(out, "  No tracked keywords identified yet.")?;
    } else {
        let peak = top.iter().map(|(_, n)| *n).max().unwrap_or(0);
        for (keyword, count) in &top {
            let bar: String = std::iter::repeat_n(MENTION_GLYPH, mention_glyphs(*count, peak))
                .collect();
            writeln!(out, "  {keyword:<LABEL_WIDTH$} | {bar} ({count})")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Recent Activity (Last {} Responses):", insights.recent.len())?;
    for (i, entry) in insights.recent.iter().enumerate() {
        let bar: String = std::iter::repeat_n(ACTIVITY_GLYPH, entry.bar_len).collect();
        writeln!(
            out,
            "  Q{}: {bar:<MAX_BAR_WIDTH$} | {} chars",
            i + 1,
            entry.response_length
        )?;
    }

    writeln!(out, "{heavy}")?;
    writeln!(out)?;
    Ok(())
}

/// One glyph per mention, scaled down proportionally once the busiest
/// keyword would overflow the bar. A non-zero count always gets one glyph.
fn mention_glyphs(count: u64, peak: u64) -> usize {
    let width = MAX_BAR_WIDTH as u64;
    if peak <= width {
        return count as usize;
    }
    (count * width / peak).max(u64::from(count > 0)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::KeywordVocabulary;
    use crate::history::record::InteractionRecord;

    fn render(records: &[InteractionRecord], minutes: f64) -> String {
        let vocab = KeywordVocabulary::new(["tuple", "list", "class"]).unwrap();
        let insights = Insights::compute(records, &vocab, 5, 5);
        let mut buf = Vec::new();
        render_text_summary(&mut buf, &insights, minutes).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn empty_history_renders_placeholders() {
        let text = render(&[], 0.0);
        assert!(text.contains("CUMULATIVE TUTORING INSIGHTS"));
        assert!(text.contains("Total Queries:     0"));
        assert!(text.contains(NO_DATA));
        assert!(text.contains("No tracked keywords identified yet."));
    }

    #[test]
    fn keyword_rows_use_fixed_label_column() {
        let records = [
            InteractionRecord::new("a tuple and a list", "x".repeat(13), "m", Some(1.5)),
            InteractionRecord::new("another tuple", "", "m", Some(2.0)),
        ];
        let text = render(&records, 2.0);
        assert!(text.contains("Session Duration:  2.0 minutes"));
        assert!(text.contains("Avg Tutor Length:  6.5 chars"));
        assert!(text.contains("  tuple        | ●● (2)"), "{text}");
        assert!(text.contains("  list         | ● (1)"), "{text}");
    }

    #[test]
    fn activity_rows_pad_bar_and_show_raw_length() {
        let records = [
            InteractionRecord::new("q", "x".repeat(1000), "m", None),
            InteractionRecord::new("q", "x".repeat(4000), "m", None),
        ];
        let text = render(&records, 0.5);
        let q1 = format!("  Q1: {}{} | 1000 chars", "█".repeat(15), " ".repeat(15));
        let q2 = format!("  Q2: {} | 4000 chars", "█".repeat(30));
        assert!(text.contains(&q1), "{text}");
        assert!(text.contains(&q2), "{text}");
    }

    #[test]
    fn mention_bars_scale_past_the_width() {
        assert_eq!(mention_glyphs(3, 10), 3);
        assert_eq!(mention_glyphs(60, 60), 30);
        assert_eq!(mention_glyphs(30, 60), 15);
        assert_eq!(mention_glyphs(1, 600), 1);
    }
}
