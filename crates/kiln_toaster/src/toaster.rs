//! The batch driver.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crossbeam_channel::unbounded;
use kiln_spells::{BlockFilter, Engine, EngineError, Spell, SpellOptions, SpellRegistry};

use crate::cancel::CancelToken;
use crate::discover::{discover, FileFilter, SourceFile};
use crate::error::ToastError;
use crate::options::ToastOptions;
use crate::output::OutputPlan;
use crate::process::FileJob;
use crate::report::{FileOutcome, FileStatus, ToastReport};

/// Applies a spell pipeline to a batch of files on a worker pool.
pub struct Toaster {
    registry: SpellRegistry,
    options: ToastOptions,
    filter: FileFilter,
    engine: Engine,
    spell_options: SpellOptions,
    plan: OutputPlan,
}

impl Toaster {
    /// Validates the options against the registry. Unknown spells, bad
    /// patterns, unknown block kinds and mutating spells in dry-run mode are
    /// rejected here, before any file is touched.
    pub fn new(registry: SpellRegistry, options: ToastOptions) -> Result<Self, ToastError> {
        if options.spells.is_empty() {
            return Err(ToastError::NoSpells);
        }
        let filter = FileFilter::new(&options.include, &options.exclude)?;
        let blocks = BlockFilter::parse(&options.include_blocks, &options.exclude_blocks)?;
        let engine = Engine::new()
            .with_filter(blocks)
            .with_dry_run(options.dry_run);
        for spell in registry.resolve(&options.spells)? {
            if options.dry_run && !spell.reads_only() {
                return Err(EngineError::MutatingSpellInDryRun(spell.name().to_string()).into());
            }
        }
        Ok(Self {
            spell_options: SpellOptions::from(&options.kernels),
            plan: OutputPlan::from_options(&options),
            registry,
            options,
            filter,
            engine,
        })
    }

    /// The run options.
    pub fn options(&self) -> &ToastOptions {
        &self.options
    }

    /// Discovers the input files and processes them.
    pub fn run(&self, cancel: &CancelToken) -> Result<ToastReport, ToastError> {
        let files = discover(&self.options.inputs, &self.filter)?;
        self.run_files(&files, cancel)
    }

    /// Processes the given files. Each file runs entirely on one worker;
    /// outcomes are collected on the calling thread as they arrive.
    pub fn run_files(&self, files: &[SourceFile], cancel: &CancelToken) -> Result<ToastReport, ToastError> {
        let spells: Vec<&dyn Spell> = self.registry.resolve(&self.options.spells)?;
        let jobs = self.options.effective_jobs();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("kiln-toast-{i}"))
            .build()?;
        log::info!(
            "toasting {} file(s) with {} on {jobs} worker(s)",
            files.len(),
            self.options.spells.join(", ")
        );

        let job = FileJob {
            spells: &spells,
            engine: &self.engine,
            options: &self.spell_options,
            plan: &self.plan,
            resume: self.options.resume,
        };
        let (tx, rx) = unbounded::<FileOutcome>();
        let mut outcomes = Vec::with_capacity(files.len());

        std::thread::scope(|scope| {
            let job = &job;
            scope.spawn(move || {
                pool.scope(|s| {
                    for file in files {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let tx = tx.clone();
                        s.spawn(move |_| {
                            let outcome = if cancel.is_cancelled() {
                                FileOutcome::new(file.path.clone(), FileStatus::Cancelled)
                            } else {
                                process_isolated(job, file)
                            };
                            // The collector outlives every sender.
                            let _ = tx.send(outcome);
                        });
                    }
                });
            });

            for outcome in &rx {
                if outcome.status.is_fatal() {
                    log::error!("{}: {:?}", outcome.input.display(), outcome.status);
                }
                outcomes.push(outcome);
                log::debug!("{}/{} file(s) done", outcomes.len(), files.len());
            }
        });

        let cancelled = cancel.is_cancelled();
        if cancelled {
            let seen: std::collections::HashSet<_> = outcomes.iter().map(|o| o.input.clone()).collect();
            outcomes.extend(
                files
                    .iter()
                    .filter(|f| !seen.contains(&f.path))
                    .map(|f| FileOutcome::new(f.path.clone(), FileStatus::Cancelled)),
            );
            log::warn!("cancelled; remaining files were not started");
        }
        outcomes.sort_by(|a, b| a.input.cmp(&b.input));
        Ok(ToastReport {
            files: outcomes,
            cancelled,
        })
    }
}

/// Turns a panic outside the spell engine into a failed outcome so one file
/// can never take the batch down.
fn process_isolated(job: &FileJob<'_>, file: &SourceFile) -> FileOutcome {
    catch_unwind(AssertUnwindSafe(|| job.process(file))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        FileOutcome::new(
            file.path.clone(),
            FileStatus::Failed {
                error: format!("internal error: {message}"),
            },
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(spells: &[&str]) -> ToastOptions {
        ToastOptions {
            spells: spells.iter().map(|s| s.to_string()).collect(),
            jobs: Some(2),
            ..ToastOptions::default()
        }
    }

    #[test]
    fn rejects_unknown_spell() {
        let err = Toaster::new(SpellRegistry::with_builtins(), options(&["opt_magic"])).err();
        assert!(matches!(err, Some(ToastError::Engine(EngineError::UnknownSpell(_)))));
    }

    #[test]
    fn rejects_empty_pipeline() {
        let err = Toaster::new(SpellRegistry::with_builtins(), options(&[])).err();
        assert!(matches!(err, Some(ToastError::NoSpells)));
    }

    #[test]
    fn dry_run_rejects_mutating_spells_up_front() {
        let mut opts = options(&["dump", "opt_stripify"]);
        opts.dry_run = true;
        let err = Toaster::new(SpellRegistry::with_builtins(), opts).err();
        assert!(matches!(
            err,
            Some(ToastError::Engine(EngineError::MutatingSpellInDryRun(_)))
        ));

        let mut opts = options(&["dump", "check_readwrite"]);
        opts.dry_run = true;
        assert!(Toaster::new(SpellRegistry::with_builtins(), opts).is_ok());
    }

    #[test]
    fn rejects_unknown_block_kind() {
        let mut opts = options(&["dump"]);
        opts.exclude_blocks = vec!["Teapot".into()];
        let err = Toaster::new(SpellRegistry::with_builtins(), opts).err();
        assert!(matches!(
            err,
            Some(ToastError::Engine(EngineError::UnknownBlockKind(_)))
        ));
    }

    #[test]
    fn cancelled_before_start_processes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.kiln");
        std::fs::write(&path, b"not a kiln file").unwrap();
        let mut opts = options(&["dump"]);
        opts.inputs = vec![dir.path().to_path_buf()];
        let toaster = Toaster::new(SpellRegistry::with_builtins(), opts).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let report = toaster.run(&cancel).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].status, FileStatus::Cancelled);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn malformed_file_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.kiln"), b"garbage").unwrap();
        let mut opts = options(&["dump"]);
        opts.inputs = vec![dir.path().to_path_buf()];
        let toaster = Toaster::new(SpellRegistry::with_builtins(), opts).unwrap();
        let report = toaster.run(&CancelToken::new()).unwrap();
        assert_eq!(report.fatal_count(), 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.count_code(kiln_graph::codes::MALFORMED_STREAM), 1);
    }
}
