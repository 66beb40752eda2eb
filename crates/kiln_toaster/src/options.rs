//! Settings for one toaster run.

use std::path::PathBuf;

use kiln_config::{KernelConfig, KilnConfig};

/// Everything a run needs besides the spell registry. Built from
/// `kiln.toml` with [`ToastOptions::from_config`], then overridden field by
/// field from the command line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToastOptions {
    /// Files and directories to process; directories are walked recursively.
    pub inputs: Vec<PathBuf>,
    /// Spell names, run in order.
    pub spells: Vec<String>,
    /// Worker threads; `None` means available parallelism.
    pub jobs: Option<usize>,
    /// Only process files whose path matches one of these patterns.
    pub include: Vec<String>,
    /// Skip files whose path matches one of these patterns.
    pub exclude: Vec<String>,
    /// Block kinds spells may visit; empty means all.
    pub include_blocks: Vec<String>,
    /// Block kinds spells never visit, with their subtrees.
    pub exclude_blocks: Vec<String>,
    /// Root that input paths are made relative to when remapping.
    pub source_dir: Option<PathBuf>,
    /// Root that outputs are written under, mirroring the input layout.
    pub dest_dir: Option<PathBuf>,
    /// Prepended to each output file stem.
    pub prefix: String,
    /// Appended to each output file stem.
    pub suffix: String,
    /// Skip files whose output already exists.
    pub resume: bool,
    /// Run read-only spells and write nothing.
    pub dry_run: bool,
    /// Write a patch against the input instead of the output file.
    pub create_patch: bool,
    /// Kernel parameters.
    pub kernels: KernelConfig,
}

impl ToastOptions {
    /// Options seeded from a configuration file, with no inputs yet.
    pub fn from_config(config: &KilnConfig) -> Self {
        let t = &config.toaster;
        Self {
            spells: t.spells.clone(),
            jobs: t.jobs,
            include: t.include.clone(),
            exclude: t.exclude.clone(),
            include_blocks: t.include_blocks.clone(),
            exclude_blocks: t.exclude_blocks.clone(),
            prefix: t.prefix.clone(),
            suffix: t.suffix.clone(),
            kernels: config.kernels.clone(),
            ..Self::default()
        }
    }

    /// The worker count to use.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_from_config() {
        let config = kiln_config::load_config_from_str(
            r#"
            [toaster]
            jobs = 3
            spells = ["opt_stripify"]
            suffix = "_opt"

            [kernels]
            cache_size = 24
            "#,
        )
        .unwrap();
        let options = ToastOptions::from_config(&config);
        assert_eq!(options.jobs, Some(3));
        assert_eq!(options.spells, vec!["opt_stripify"]);
        assert_eq!(options.suffix, "_opt");
        assert_eq!(options.kernels.cache_size, 24);
        assert!(options.inputs.is_empty());
        assert_eq!(options.effective_jobs(), 3);
    }

    #[test]
    fn jobs_default_to_parallelism() {
        let options = ToastOptions::default();
        assert!(options.effective_jobs() >= 1);
    }
}
