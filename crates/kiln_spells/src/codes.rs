//! Diagnostic codes raised by the engine and the built-in spells.
//!
//! Kernel warnings carry their own `K` codes.

use kiln_diagnostics::{Category, DiagnosticCode};

/// A spell failed or panicked at a block; the block was left unchanged.
pub const SPELL_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Spell, 1);
/// Serializing and reloading the graph did not give back the same blocks.
pub const READWRITE_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Spell, 2);
/// Average transform-to-vertex ratio of a geometry block.
pub const ATVR_REPORT: DiagnosticCode = DiagnosticCode::new(Category::Info, 301);
