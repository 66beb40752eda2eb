//! File and directory level patching.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::apply::apply;
use crate::atomic::write_atomic;
use crate::diff::diff;
use crate::error::PatchError;

fn read(path: &Path) -> Result<Vec<u8>, PatchError> {
    std::fs::read(path).map_err(|e| PatchError::io(path, e))
}

fn write(path: &Path, data: &[u8]) -> Result<(), PatchError> {
    write_atomic(path, data).map_err(|e| PatchError::io(path, e))
}

/// Writes a patch from the file at `old` to the file at `new`.
pub fn diff_file(old: &Path, new: &Path, patch: &Path) -> Result<(), PatchError> {
    let old_bytes = read(old)?;
    let new_bytes = read(new)?;
    write(patch, &diff(&old_bytes, &new_bytes)?)
}

/// Applies the patch at `patch` to the file at `old` and writes the result
/// to `new` atomically. Nothing is written if the patch does not apply.
pub fn apply_file(old: &Path, patch: &Path, new: &Path) -> Result<(), PatchError> {
    let old_bytes = read(old)?;
    let patch_bytes = read(patch)?;
    let new_bytes = apply(&old_bytes, &patch_bytes)?;
    write(new, &new_bytes)
}

/// The patch file for `file`: the same name with `.patch` appended.
pub fn patch_path_for(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".patch");
    PathBuf::from(name)
}

/// What [`diff_tree`] did, by path relative to the old directory.
#[derive(Debug, Default, Serialize)]
pub struct TreeSummary {
    /// Files a patch was written for.
    pub patched: Vec<PathBuf>,
    /// Files with no counterpart in the new directory.
    pub skipped: Vec<PathBuf>,
    /// Files that could not be diffed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), PatchError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PatchError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| PatchError::io(dir, e))?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Writes a patch for every file under `old_dir` that also exists at the
/// same relative path under `new_dir`. Patches land at the same relative
/// path under `patch_dir` with `.patch` appended.
///
/// Only failing to list `old_dir` is an error; per-file failures are
/// collected in the summary.
pub fn diff_tree(old_dir: &Path, new_dir: &Path, patch_dir: &Path) -> Result<TreeSummary, PatchError> {
    let mut files = Vec::new();
    walk_dir(old_dir, &mut files)?;
    files.sort();

    let mut summary = TreeSummary::default();
    for old in files {
        let Ok(relative) = old.strip_prefix(old_dir).map(Path::to_path_buf) else {
            continue;
        };
        let new = new_dir.join(&relative);
        if !new.is_file() {
            log::info!("skipped {} (no new file)", relative.display());
            summary.skipped.push(relative);
            continue;
        }
        let patch = patch_path_for(&patch_dir.join(&relative));
        match diff_file(&old, &new, &patch) {
            Ok(()) => {
                log::info!("making {}", patch.display());
                summary.patched.push(relative);
            }
            Err(err) => {
                log::warn!("{}: {err}", relative.display());
                summary.failed.push((relative, err.to_string()));
            }
        }
    }
    Ok(summary)
}
