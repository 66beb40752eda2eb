//! Diagnostic codes raised while loading a graph.

use kiln_diagnostics::{Category, DiagnosticCode};

/// The byte stream is malformed.
pub const MALFORMED_STREAM: DiagnosticCode = DiagnosticCode::new(Category::Parse, 1);
/// A link target is outside the block range; the link was nulled.
pub const LINK_OUT_OF_RANGE: DiagnosticCode = DiagnosticCode::new(Category::Structural, 101);
/// A block references itself; the link was nulled.
pub const SELF_REFERENCE: DiagnosticCode = DiagnosticCode::new(Category::Structural, 102);
/// A header root is invalid and was dropped.
pub const INVALID_ROOT: DiagnosticCode = DiagnosticCode::new(Category::Structural, 103);
/// Owning edges form a cycle; the file cannot be processed.
pub const OWNERSHIP_CYCLE: DiagnosticCode = DiagnosticCode::new(Category::Structural, 104);
