//! Append-only writer for the history log.
//!
//! Each record is rendered to one JSON line in memory and written with a
//! single `write_all`, so a crash mid-append leaves at worst one truncated
//! trailing line (which the validation pass drops) and never an interleaved
//! one. The file is opened and closed per append; nothing is held between
//! exchanges.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, TutorError};
use crate::history::record::InteractionRecord;

/// Appends records to a JSONL history file, creating it on first use.
#[derive(Debug, Clone)]
pub struct HistoryWriter {
    path: PathBuf,
}

impl HistoryWriter {
    /// Writer for the log at `path`; nothing is opened until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub fn append(&self, record: &InteractionRecord) -> Result<()> {
        let mut line = record.to_line();
        line.push('\n');

        let mut file = open_append(&self.path)?;
        file.write_all(line.as_bytes())
            .map_err(|source| TutorError::io(&self.path, source))?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = line.len(),
            "appended history record"
        );
        Ok(())
    }
}

/// Open or create a file for appending, creating parent directories.
fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TutorError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TutorError::io(path, source))
}
