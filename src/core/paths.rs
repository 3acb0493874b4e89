//! Shared path manipulation utilities.

use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Suffix appended to a log's stem when a repaired copy is written.
pub const CLEANED_SUFFIX: &str = "_cleaned";

/// Derive the repaired-log path for `input` inside `dir`.
///
/// `logs/query_history.jsonl` → `{dir}/query_history_cleaned.jsonl`. The
/// original extension is preserved; an input without one gets none.
pub fn cleaned_path(input: &Path, dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| OsString::from("history"), OsString::from);
    let mut name = stem;
    name.push(CLEANED_SUFFIX);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    dir.join(name)
}

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. path does not exist), the path is made absolute relative
/// to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
