//! Diagnostic codes for patch failures.

use kiln_diagnostics::{Category, DiagnosticCode};

/// The patch was made against a different input.
pub const SOURCE_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Patch, 1);
/// The patch is damaged or not a patch at all.
pub const CORRUPT_PATCH: DiagnosticCode = DiagnosticCode::new(Category::Patch, 2);
/// Applying the patch did not reproduce the recorded output.
pub const RESULT_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Patch, 3);
/// Reading or writing a file failed.
pub const PATCH_IO: DiagnosticCode = DiagnosticCode::new(Category::Patch, 4);
