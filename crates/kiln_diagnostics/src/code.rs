//! Diagnostic codes with category prefixes for structured problem identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
///
/// Each category maps to a single-character prefix used in diagnostic code
/// display (e.g., `P001` for a parse failure, `K201` for a kernel warning).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Malformed byte stream, prefixed with `P`.
    Parse,
    /// Bad block reference or ownership problem, prefixed with `S`.
    Structural,
    /// Failure raised by a spell at a single block, prefixed with `X`.
    Spell,
    /// Degenerate input to a geometry kernel, prefixed with `K`.
    Kernel,
    /// Diff or apply mismatch, prefixed with `D`.
    Patch,
    /// Informational reports such as measured statistics, prefixed with `I`.
    Info,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Parse => 'P',
            Category::Structural => 'S',
            Category::Spell => 'X',
            Category::Kernel => 'K',
            Category::Patch => 'D',
            Category::Info => 'I',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g., `S101`, `K201`, `X001`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
