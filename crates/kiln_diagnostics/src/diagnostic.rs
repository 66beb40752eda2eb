//! The diagnostic record.

use crate::code::DiagnosticCode;
use crate::location::Location;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// One recoverable problem or measurement, tied to a block where possible.
///
/// Loaders, spells and kernels all report through this type; the toaster
/// attaches the file name and the CLI renders or serializes the result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How serious it is.
    pub severity: Severity,
    /// Stable code, such as `K201`.
    pub code: DiagnosticCode,
    /// One-line description.
    pub message: String,
    /// File and block it concerns.
    pub location: Location,
    /// Extra lines rendered as `= note: ...`.
    pub notes: Vec<String>,
    /// Suggested fixes rendered as `= help: ...`.
    pub help: Vec<String>,
}

impl Diagnostic {
    /// A diagnostic of any severity.
    pub fn new(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Shorthand for [`Severity::Error`].
    pub fn error(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Error, code, message, location)
    }

    /// Shorthand for [`Severity::Warning`].
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Warning, code, message, location)
    }

    /// Shorthand for [`Severity::Note`].
    pub fn note(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Note, code, message, location)
    }

    /// Appends a note line.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Appends a help line.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Sets the file the diagnostic belongs to, keeping the block location.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.location.file = Some(file.into());
        self
    }
}
