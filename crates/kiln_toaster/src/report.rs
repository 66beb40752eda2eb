//! Per-file outcomes and the batch report.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use kiln_diagnostics::{Diagnostic, DiagnosticCode, Severity};
use kiln_spells::RunSummary;
use serde::Serialize;

/// What happened to one input file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// The transformed file (or patch) was written.
    Written {
        /// Where it was written.
        output: PathBuf,
    },
    /// No spell changed the file, so nothing was written.
    Unchanged,
    /// Spells ran in dry-run mode; nothing was written.
    DryRun,
    /// The file was not processed.
    Skipped {
        /// Why.
        reason: String,
    },
    /// Cancellation arrived before the file was started.
    Cancelled,
    /// A fatal error stopped processing of this file.
    Failed {
        /// The error.
        error: String,
    },
}

impl FileStatus {
    /// Returns `true` for fatal per-file errors.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FileStatus::Failed { .. })
    }
}

/// The result of processing one file, sent from a worker to the collector.
#[derive(Clone, Debug, Serialize)]
pub struct FileOutcome {
    /// The input file.
    pub input: PathBuf,
    /// What happened.
    #[serde(flatten)]
    pub status: FileStatus,
    /// Spell counts.
    pub summary: RunSummary,
    /// Every diagnostic raised for the file, loader ones first.
    pub diagnostics: Vec<Diagnostic>,
}

impl FileOutcome {
    /// An outcome with no spell activity.
    pub fn new(input: PathBuf, status: FileStatus) -> Self {
        Self {
            input,
            status,
            summary: RunSummary::default(),
            diagnostics: Vec::new(),
        }
    }
}

/// The collected outcome of a batch.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ToastReport {
    /// One entry per discovered file, sorted by input path.
    pub files: Vec<FileOutcome>,
    /// Whether the run was interrupted.
    pub cancelled: bool,
}

impl ToastReport {
    /// Files that hit a fatal error.
    pub fn fatal(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.status.is_fatal())
    }

    /// Number of files that hit a fatal error.
    pub fn fatal_count(&self) -> usize {
        self.fatal().count()
    }

    /// Number of files written.
    pub fn written_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Written { .. }))
            .count()
    }

    /// All diagnostics, in file order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| &f.diagnostics)
    }

    /// Number of diagnostics with `code` across all files.
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.diagnostics().filter(|d| d.code == code).count()
    }

    /// Diagnostic counts by code, for the summary.
    pub fn counts_by_code(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for diag in self.diagnostics() {
            *counts.entry(diag.code.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Process exit status: nonzero only if some file failed fatally.
    /// Recoverable diagnostics never affect it.
    pub fn exit_code(&self) -> i32 {
        if self.fatal_count() > 0 {
            1
        } else {
            0
        }
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// A short human-readable summary.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} file(s): {} written, {} failed{}",
            self.files.len(),
            self.written_count(),
            self.fatal_count(),
            if self.cancelled { ", cancelled" } else { "" }
        );
        for file in self.fatal() {
            if let FileStatus::Failed { error } = &file.status {
                let _ = writeln!(out, "  failed: {}: {error}", file.input.display());
            }
        }
        let counts = self.counts_by_code();
        if !counts.is_empty() {
            let listed: Vec<String> = counts.iter().map(|(code, n)| format!("{code} x{n}")).collect();
            let _ = writeln!(out, "  diagnostics: {}", listed.join(", "));
        }
        let warnings = self
            .diagnostics()
            .filter(|d| d.severity >= Severity::Warning)
            .count();
        if warnings > 0 {
            let _ = writeln!(out, "  {warnings} warning(s) or error(s) reported");
        }
        out
    }
}
