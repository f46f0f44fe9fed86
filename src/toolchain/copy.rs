// src/toolchain/copy.rs

//! Glob copy rules used by packaging and source export

use crate::error::{Error, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};
use tracing::debug;
use walkdir::WalkDir;

/// Which layout root a copy rule reads from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CopyRoot {
    #[default]
    Source,
    Build,
    Package,
}

/// A `[[packaging.copy]]` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    /// Glob matched against paths relative to `from`/`src`; `*` crosses directories
    pub pattern: String,

    #[serde(default)]
    pub from: CopyRoot,

    /// Sub-path below the root to copy from
    #[serde(default)]
    pub src: Option<String>,

    /// Destination below the package folder
    #[serde(default)]
    pub dst: Option<String>,

    /// Keep the relative directory structure (false flattens)
    #[serde(default = "default_true")]
    pub keep_path: bool,

    /// Fail packaging if nothing matches
    #[serde(default)]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

impl CopyRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            from: CopyRoot::default(),
            src: None,
            dst: None,
            keep_path: true,
            required: false,
        }
    }
}

/// Copy files under `src` whose relative path matches `pattern` into `dst`
///
/// Returns the destination paths. A missing `src` copies nothing.
pub fn copy_files(
    pattern: &str,
    src: &Path,
    dst: &Path,
    keep_path: bool,
) -> Result<Vec<PathBuf>> {
    let matcher = Pattern::new(pattern).map_err(|e| {
        Error::PackagingFailure(format!("Invalid copy pattern '{}': {}", pattern, e))
    })?;

    if !src.is_dir() {
        debug!("Copy source {} does not exist", src.display());
        return Ok(Vec::new());
    }

    // Collect first so files copied into a nested dst are not revisited
    let mut matches = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::IoError(format!("Failed to walk {}: {}", src.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if matcher.matches(&relative_str) {
            matches.push(relative.to_path_buf());
        }
    }

    let mut copied = Vec::with_capacity(matches.len());
    for relative in matches {
        let target = if keep_path {
            dst.join(&relative)
        } else {
            match relative.file_name() {
                Some(name) => dst.join(name),
                None => continue,
            }
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::copy(src.join(&relative), &target).map_err(|e| {
            Error::IoError(format!(
                "Failed to copy {} to {}: {}",
                relative.display(),
                target.display(),
                e
            ))
        })?;
        copied.push(target);
    }

    debug!(
        "Copied {} file(s) matching '{}' from {}",
        copied.len(),
        pattern,
        src.display()
    );
    Ok(copied)
}
