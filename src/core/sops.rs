//! SOPS recipient refresh.
//!
//! Re-encrypts every SOPS file in a source tree for the recipients currently
//! listed in `.sops.yaml` by running `sops updatekeys --yes` on each.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::constants;
use crate::core::tool::Tool;
use crate::error::{Result, ToolError};

/// Files visited by [`update_keys`].
#[derive(Debug, Default)]
pub struct UpdateSummary {
    pub updated: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Whether `name` marks a SOPS-managed file.
pub fn is_sops_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    constants::SOPS_SUFFIXES.iter().any(|s| lower.ends_with(s))
        || constants::SOPS_FILE_NAMES.iter().any(|n| lower == *n)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|n| constants::SKIP_DIRS.contains(&n))
            .unwrap_or(false)
}

/// SOPS files under `root`, sorted by path.
pub fn find_sops_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable path: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map(is_sops_file).unwrap_or(false))
        .map(|e| e.into_path())
        .collect()
}

/// Run `sops updatekeys --yes` on every SOPS file under `root`.
///
/// All files are attempted; failures are reported together at the end.
///
/// # Errors
///
/// `ToolError::NotFound` if sops is missing, `ToolError::Failed` if any
/// file could not be updated.
pub fn update_keys(root: &Path, sops: &Tool) -> Result<UpdateSummary> {
    sops.ensure_available()?;

    let mut summary = UpdateSummary::default();
    for file in find_sops_files(root) {
        info!("updating keys: {}", file.display());
        let args = [OsStr::new("updatekeys"), OsStr::new("--yes"), file.as_os_str()];
        match sops.run(args) {
            Ok(()) => summary.updated.push(file),
            Err(e) => {
                warn!("failed to update {}: {}", file.display(), e);
                summary.failed.push(file);
            }
        }
    }

    if !summary.failed.is_empty() {
        let files: Vec<String> = summary
            .failed
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        return Err(ToolError::Failed {
            tool: sops.name(),
            status: format!(
                "{} of {} files failed",
                files.len(),
                files.len() + summary.updated.len()
            ),
            stderr: files.join("\n"),
        }
        .into());
    }

    Ok(summary)
}
