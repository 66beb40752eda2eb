//! The per-file pipeline: load, run spells, write.

use std::path::Path;

use kiln_diagnostics::{Diagnostic, DiagnosticSink, Location};
use kiln_graph::codes::{MALFORMED_STREAM, OWNERSHIP_CYCLE};
use kiln_graph::{load, serialize, GraphError};
use kiln_patch::{diff, write_atomic};
use kiln_spells::{Engine, Spell, SpellContext, SpellOptions};

use crate::discover::SourceFile;
use crate::output::OutputPlan;
use crate::report::{FileOutcome, FileStatus};

/// Everything a worker needs, shared read-only between workers.
pub struct FileJob<'a> {
    /// The resolved pipeline.
    pub spells: &'a [&'a dyn Spell],
    /// Engine with the block filter and dry-run flag applied.
    pub engine: &'a Engine,
    /// Kernel parameters.
    pub options: &'a SpellOptions,
    /// Output naming.
    pub plan: &'a OutputPlan,
    /// Skip files whose output exists.
    pub resume: bool,
}

fn load_failure(err: &GraphError, file: &str) -> Diagnostic {
    let code = match err {
        GraphError::Structural(_) => OWNERSHIP_CYCLE,
        _ => MALFORMED_STREAM,
    };
    Diagnostic::error(code, err.to_string(), Location::NONE.with_file(file))
        .with_note("the file was skipped")
}

impl FileJob<'_> {
    /// Runs the whole pipeline for one file. Never panics on bad input;
    /// every problem ends up in the outcome.
    pub fn process(&self, file: &SourceFile) -> FileOutcome {
        let display = file.path.display().to_string();
        let input = file.path.clone();

        let output = match self.plan.output_for(file) {
            Ok(path) => path,
            Err(error) => return FileOutcome::new(input, FileStatus::Failed { error }),
        };
        if self.resume && output != file.path && output.exists() {
            log::info!("{display}: output exists, skipped");
            return FileOutcome::new(
                input,
                FileStatus::Skipped {
                    reason: format!("{} exists", output.display()),
                },
            );
        }

        let bytes = match std::fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return FileOutcome::new(
                    input,
                    FileStatus::Failed {
                        error: format!("cannot read file: {e}"),
                    },
                )
            }
        };

        let loaded = match load(&bytes) {
            Ok(loaded) => loaded,
            Err(err) => {
                log::warn!("{display}: {err}");
                let mut outcome = FileOutcome::new(
                    input,
                    FileStatus::Failed {
                        error: err.to_string(),
                    },
                );
                outcome.diagnostics.push(load_failure(&err, &display));
                return outcome;
            }
        };
        let mut graph = loaded.graph;
        let mut diagnostics: Vec<Diagnostic> = loaded
            .diagnostics
            .into_iter()
            .map(|d| d.in_file(display.as_str()))
            .collect();

        log::info!("{display}: {} block(s)", graph.len());
        let sink = DiagnosticSink::new();
        let ctx = SpellContext::new(&sink, self.options).with_file(&display);
        let result = self.engine.run_pipeline(self.spells, &mut graph, &ctx);
        diagnostics.extend(sink.take_all());
        let summary = match result {
            Ok(summary) => summary,
            Err(err) => {
                let mut outcome = FileOutcome::new(
                    input,
                    FileStatus::Failed {
                        error: err.to_string(),
                    },
                );
                outcome.diagnostics = diagnostics;
                return outcome;
            }
        };

        let status = if self.engine.is_dry_run() {
            FileStatus::DryRun
        } else if !summary.changed() {
            FileStatus::Unchanged
        } else {
            match self.write(&bytes, &graph, &output) {
                Ok(()) => FileStatus::Written {
                    output: output.clone(),
                },
                Err(error) => {
                    log::warn!("{display}: {error}");
                    FileStatus::Failed { error }
                }
            }
        };
        log::debug!("{display}: {status:?}");
        FileOutcome {
            input,
            status,
            summary,
            diagnostics,
        }
    }

    fn write(&self, original: &[u8], graph: &kiln_graph::Graph, output: &Path) -> Result<(), String> {
        let bytes = serialize(graph).map_err(|e| format!("cannot serialize: {e}"))?;
        let data = if self.plan.creates_patches() {
            diff(original, &bytes).map_err(|e| e.to_string())?
        } else {
            bytes
        };
        write_atomic(output, &data).map_err(|e| format!("cannot write {}: {e}", output.display()))
    }
}
