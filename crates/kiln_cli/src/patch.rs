//! `kiln diff`, `kiln apply` and `kiln patch-dir`.

use std::path::Path;

use kiln_diagnostics::{Diagnostic, DiagnosticRenderer, Location, TerminalRenderer};
use kiln_patch::PatchError;

use crate::GlobalArgs;

/// Prints a patch failure as a diagnostic and returns the exit status.
fn report(err: &PatchError, file: &Path, global: &GlobalArgs) -> i32 {
    let diag = Diagnostic::error(
        err.code(),
        err.to_string(),
        Location::NONE.with_file(file.display().to_string()),
    );
    eprintln!("{}", TerminalRenderer::new(global.color, 100).render(&diag));
    1
}

/// Runs the `kiln diff` command.
pub fn diff(
    old: &Path,
    new: &Path,
    patch: &Path,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    match kiln_patch::diff_file(old, new, patch) {
        Ok(()) => {
            if !global.quiet {
                eprintln!("   Wrote {}", patch.display());
            }
            Ok(0)
        }
        Err(err) => Ok(report(&err, patch, global)),
    }
}

/// Runs the `kiln apply` command. Nothing is written if the patch does not
/// apply.
pub fn apply(
    old: &Path,
    patch: &Path,
    new: &Path,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    match kiln_patch::apply_file(old, patch, new) {
        Ok(()) => {
            if !global.quiet {
                eprintln!("   Wrote {}", new.display());
            }
            Ok(0)
        }
        Err(err) => Ok(report(&err, old, global)),
    }
}

/// Runs the `kiln patch-dir` command. Fails if any file could not be diffed.
pub fn patch_dir(
    old_dir: &Path,
    new_dir: &Path,
    patch_dir: &Path,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let summary = kiln_patch::diff_tree(old_dir, new_dir, patch_dir)?;
    if !global.quiet {
        for path in &summary.skipped {
            eprintln!("   Skipped {} (no new file)", path.display());
        }
        eprintln!(
            "   {} patch(es) written, {} skipped, {} failed",
            summary.patched.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
    }
    for (path, reason) in &summary.failed {
        eprintln!("error: {}: {reason}", path.display());
    }
    Ok(if summary.failed.is_empty() { 0 } else { 1 })
}
