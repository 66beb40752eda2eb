//! Collecting diagnostics while a file is processed.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Collected {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

/// Diagnostics gathered for one file.
///
/// Spells only ever see a shared reference, so emission goes through a mutex.
/// Error and warning tallies survive [`take_all`](Self::take_all); they count
/// everything the sink has seen.
#[derive(Default)]
pub struct DiagnosticSink {
    inner: Mutex<Collected>,
}

impl DiagnosticSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        // A spell that panicked mid-emit leaves a complete Vec behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        let mut inner = self.lock();
        match diag.severity {
            Severity::Error => inner.errors += 1,
            Severity::Warning => inner.warnings += 1,
            Severity::Note => {}
        }
        inner.diagnostics.push(diag);
    }

    /// Records every diagnostic from `diags`, in order.
    pub fn extend(&self, diags: impl IntoIterator<Item = Diagnostic>) {
        for diag in diags {
            self.emit(diag);
        }
    }

    /// Returns `true` once any error has been emitted.
    pub fn has_errors(&self) -> bool {
        self.lock().errors > 0
    }

    /// Errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.lock().errors
    }

    /// Warnings emitted so far.
    pub fn warning_count(&self) -> usize {
        self.lock().warnings
    }

    /// Diagnostics currently held with the given code.
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.lock().diagnostics.iter().filter(|d| d.code == code).count()
    }

    /// Drains the held diagnostics in emission order.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.lock().diagnostics)
    }

    /// A copy of the held diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().diagnostics.clone()
    }
}
