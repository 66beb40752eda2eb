//! `kiln toast`: runs a spell pipeline over asset files.
//!
//! 1. Load `kiln.toml` (from `--config` or the working directory)
//! 2. Override its toaster and kernel settings from the flags
//! 3. Validate the pipeline against the spell registry
//! 4. Process the files on the worker pool, Ctrl-C stopping dispatch
//! 5. Render diagnostics and the summary, or the JSON report

use kiln_config::{KilnConfig, ToasterConfig};
use kiln_diagnostics::{DiagnosticRenderer, Severity, TerminalRenderer};
use kiln_spells::SpellRegistry;
use kiln_toaster::{CancelToken, ToastOptions, ToastReport, Toaster};

use crate::{GlobalArgs, ReportFormat, ToastArgs};

/// Exit status after an interrupt, following the shell convention.
const EXIT_INTERRUPTED: i32 = 130;

/// Loads the configuration named by `--config`, or `kiln.toml` in the
/// working directory if there is one.
pub fn load_config(global: &GlobalArgs) -> Result<KilnConfig, Box<dyn std::error::Error>> {
    Ok(match &global.config {
        Some(path) => kiln_config::load_config_file(path)?,
        None => kiln_config::load_config(&std::env::current_dir()?)?,
    })
}

/// Layers the command-line flags over the configured defaults.
pub fn build_options(
    args: &ToastArgs,
    config: &KilnConfig,
) -> Result<ToastOptions, Box<dyn std::error::Error>> {
    let mut options = ToastOptions::from_config(config);
    options.inputs = args.inputs.clone();
    if !args.spells.is_empty() {
        options.spells = args.spells.clone();
    }
    if args.jobs.is_some() {
        options.jobs = args.jobs;
    }
    options.include.extend(args.include.iter().cloned());
    options.exclude.extend(args.exclude.iter().cloned());
    options.include_blocks.extend(args.include_blocks.iter().cloned());
    options.exclude_blocks.extend(args.exclude_blocks.iter().cloned());
    options.source_dir = args.source_dir.clone();
    options.dest_dir = args.dest_dir.clone();
    if let Some(prefix) = &args.prefix {
        options.prefix = prefix.clone();
    }
    if let Some(suffix) = &args.suffix {
        options.suffix = suffix.clone();
    }
    options.resume = args.resume;
    options.dry_run = args.dry_run;
    options.create_patch = args.create_patch;
    if let Some(size) = args.cache_size {
        options.kernels.cache_size = size;
    }
    if let Some(bones) = args.max_bones {
        options.kernels.max_bones_per_partition = bones;
    }
    if args.no_stitch {
        options.kernels.stitch_strips = false;
    }

    kiln_config::validate_config(&KilnConfig {
        toaster: ToasterConfig {
            jobs: options.jobs,
            ..ToasterConfig::default()
        },
        kernels: options.kernels.clone(),
    })?;
    Ok(options)
}

fn render(report: &ToastReport, global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color, 100);
    for diag in report.diagnostics() {
        if global.quiet && diag.severity < Severity::Error {
            continue;
        }
        eprintln!("{}", renderer.render(diag));
    }
    if !global.quiet {
        eprint!("{}", report.render_summary());
    }
}

/// Runs the `kiln toast` command.
///
/// Returns 0 if every file was processed without a fatal error, 1 if some
/// file failed, and 130 if the run was interrupted.
pub fn run(args: &ToastArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_config(global)?;
    let options = build_options(args, &config)?;
    let toaster = Toaster::new(SpellRegistry::with_builtins(), options)?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupted; finishing files in progress");
        handler_token.cancel();
    })?;

    let report = toaster.run(&cancel)?;
    match args.report {
        ReportFormat::Text => render(&report, global),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(if report.cancelled {
        EXIT_INTERRUPTED
    } else {
        report.exit_code()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> ToastArgs {
        let mut argv = vec!["toast"];
        argv.extend_from_slice(extra);
        ToastArgs::parse_from(argv)
    }

    #[test]
    fn flags_override_config() {
        let config = kiln_config::load_config_from_str(
            r#"
            [toaster]
            spells = ["opt_vertex_cache"]
            jobs = 8
            suffix = "_cfg"
            exclude = ['\.bak$']

            [kernels]
            max_bones_per_partition = 8
            "#,
        )
        .unwrap();
        let a = args(&[
            "-s",
            "opt_stripify",
            "--jobs",
            "2",
            "--exclude",
            "_lod",
            "--max-bones",
            "4",
            "--no-stitch",
            "in",
        ]);
        let options = build_options(&a, &config).unwrap();
        assert_eq!(options.spells, vec!["opt_stripify"]);
        assert_eq!(options.jobs, Some(2));
        assert_eq!(options.suffix, "_cfg");
        assert_eq!(options.exclude, vec![r"\.bak$", "_lod"]);
        assert_eq!(options.kernels.max_bones_per_partition, 4);
        assert!(!options.kernels.stitch_strips);
    }

    #[test]
    fn config_spells_used_when_none_given() {
        let config = kiln_config::load_config_from_str("[toaster]\nspells = \"dump\"\n").unwrap();
        let options = build_options(&args(&["in"]), &config).unwrap();
        assert_eq!(options.spells, vec!["dump"]);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let config = KilnConfig::default();
        assert!(build_options(&args(&["--max-bones", "0", "in"]), &config).is_err());
        assert!(build_options(&args(&["--jobs", "0", "in"]), &config).is_err());
    }

    #[test]
    fn explicit_config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[kernels]\ncache_size = 16\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(path),
        };
        assert_eq!(load_config(&global).unwrap().kernels.cache_size, 16);
    }
}
