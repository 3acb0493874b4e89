//! Knowledge-base context folded into the system instruction.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::core::errors::{Result, TutorError};

/// Context used when no knowledge-base file exists.
pub const FALLBACK_CONTEXT: &str = "Standard Python documentation context.";

/// Read the knowledge base, falling back to [`FALLBACK_CONTEXT`] when the
/// file is absent. Other read failures are errors.
pub fn load_knowledge_base(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "knowledge base not found, using fallback");
            Ok(FALLBACK_CONTEXT.to_string())
        }
        Err(e) => Err(TutorError::io(path, e)),
    }
}

pub fn system_instruction(knowledge_base: &str) -> String {
    format!("Context: {knowledge_base}\nRole: Python tutor for researchers. Explain the 'why'.")
}
