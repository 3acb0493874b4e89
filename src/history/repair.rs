//! Validation pass over the history log, with repair-on-corruption.
//!
//! A pass reads the whole log once and classifies every non-blank line.
//! Malformed lines are data to filter, never a reason to abort: only I/O
//! failures escape as errors. When anything was dropped, the surviving
//! records are written to a `*_cleaned` sibling and the original is left
//! untouched.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, TutorError};
use crate::core::paths::cleaned_path;
use crate::history::record::{InteractionRecord, LineError};

/// A line that failed validation, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based position in the file.
    pub line_number: usize,
    /// Why the line was dropped.
    pub error: LineError,
}

/// Result of reading and classifying a whole log.
#[derive(Debug, Clone, Default)]
pub struct HistoryScan {
    /// Valid records in file order.
    pub records: Vec<InteractionRecord>,
    /// Lines dropped as unparseable or off-schema.
    pub rejected: Vec<RejectedLine>,
    /// Whitespace-only lines, skipped silently.
    pub blank_lines: usize,
}

impl HistoryScan {
    /// True when every non-blank line validated.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// What a validation pass did.
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    /// No log at the given path.
    Missing,
    /// Every line validated; nothing was written.
    Clean { records: usize },
    /// Invalid lines were dropped into a repaired copy.
    Repaired {
        cleaned_path: PathBuf,
        kept: usize,
        dropped: usize,
    },
}

impl RepairOutcome {
    /// `false` exactly when a repaired copy had to be written.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Repaired { .. })
    }
}

/// Read and classify every line of the log. A missing file scans as empty.
pub fn scan_history(path: &Path) -> Result<HistoryScan> {
    let mut scan = HistoryScan::default();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(scan),
        Err(e) => return Err(TutorError::io(path, e)),
    };

    let reader = BufReader::new(file);
    for (index, chunk) in reader.split(b'\n').enumerate() {
        let bytes = chunk.map_err(|e| TutorError::io(path, e))?;
        let parsed = match std::str::from_utf8(&bytes) {
            Ok(line) if line.trim().is_empty() => {
                scan.blank_lines += 1;
                continue;
            }
            Ok(line) => InteractionRecord::from_line(line.trim_end_matches('\r')),
            Err(e) => Err(LineError::Parse(format!("invalid UTF-8: {e}"))),
        };
        match parsed {
            Ok(record) => scan.records.push(record),
            Err(error) => {
                tracing::debug!(
                    path = %path.display(),
                    line = index + 1,
                    %error,
                    "dropping invalid history line"
                );
                scan.rejected.push(RejectedLine {
                    line_number: index + 1,
                    error,
                });
            }
        }
    }
    Ok(scan)
}

/// Validate the log at `path`, writing a repaired copy into `output_dir`
/// when at least one line is invalid.
pub fn repair_history(path: &Path, output_dir: &Path) -> Result<RepairOutcome> {
    if !path.exists() {
        return Ok(RepairOutcome::Missing);
    }

    let scan = scan_history(path)?;
    if scan.is_clean() {
        return Ok(RepairOutcome::Clean {
            records: scan.records.len(),
        });
    }

    let target = cleaned_path(path, output_dir);
    write_records(&target, &scan.records)?;
    tracing::warn!(
        source = %path.display(),
        cleaned = %target.display(),
        kept = scan.records.len(),
        dropped = scan.rejected.len(),
        "history log repaired"
    );
    Ok(RepairOutcome::Repaired {
        cleaned_path: target,
        kept: scan.records.len(),
        dropped: scan.rejected.len(),
    })
}

/// Validate the log at `path`, repairing into the working directory.
///
/// Returns `true` when the log is missing or fully valid (no side effects),
/// and `false` after writing `{stem}_cleaned{suffix}`.
pub fn validate_and_repair(path: &Path) -> Result<bool> {
    let cwd = std::env::current_dir().map_err(|e| TutorError::io(".", e))?;
    Ok(repair_history(path, &cwd)?.is_valid())
}

fn write_records(target: &Path, records: &[InteractionRecord]) -> Result<()> {
    let file = File::create(target).map_err(|e| TutorError::io(target, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", record.to_line()).map_err(|e| TutorError::io(target, e))?;
    }
    writer.flush().map_err(|e| TutorError::io(target, e))
}
