//! Kiln CLI: the command-line interface for the Kiln asset toolkit.
//!
//! Provides `kiln toast` to run a spell pipeline over asset files,
//! `kiln spells` to list the available spells, and `kiln diff`, `kiln apply`
//! and `kiln patch-dir` for binary patches.

#![warn(missing_docs)]

mod patch;
mod spells;
mod toast;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Kiln: batch processing for binary scene assets.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln asset toolkit")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `kiln.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a spell pipeline over asset files.
    Toast(ToastArgs),
    /// List the available spells.
    Spells {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Write a binary patch from OLD to NEW.
    Diff {
        /// The original file.
        old: PathBuf,
        /// The updated file.
        new: PathBuf,
        /// Where to write the patch.
        patch: PathBuf,
    },
    /// Apply PATCH to OLD and write the result to NEW.
    Apply {
        /// The original file.
        old: PathBuf,
        /// The patch.
        patch: PathBuf,
        /// Where to write the patched file.
        new: PathBuf,
    },
    /// Write patches for every file present in both directories.
    PatchDir {
        /// Directory with the original files.
        old_dir: PathBuf,
        /// Directory with the updated files.
        new_dir: PathBuf,
        /// Directory the patches are written to.
        patch_dir: PathBuf,
    },
}

/// Arguments for the `kiln toast` subcommand.
#[derive(Parser, Debug)]
pub struct ToastArgs {
    /// Files or directories to process.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Spell to run; repeat for a pipeline. Defaults to the configured spells.
    #[arg(short, long = "spell")]
    pub spells: Vec<String>,

    /// Worker threads (default: available parallelism).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Only process files whose path matches this regular expression.
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip files whose path matches this regular expression.
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Only let spells visit blocks of this kind.
    #[arg(long = "include-block")]
    pub include_blocks: Vec<String>,

    /// Never let spells visit blocks of this kind.
    #[arg(long = "exclude-block")]
    pub exclude_blocks: Vec<String>,

    /// Root the inputs are made relative to when writing to `--dest-dir`.
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Write outputs under this directory instead of in place.
    #[arg(long)]
    pub dest_dir: Option<PathBuf>,

    /// Prepend to output file names.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Append to output file names, before the extension.
    #[arg(long)]
    pub suffix: Option<String>,

    /// Skip files whose output already exists.
    #[arg(long)]
    pub resume: bool,

    /// Run read-only spells without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write a binary patch against each input instead of the output file.
    #[arg(long)]
    pub create_patch: bool,

    /// Simulated vertex cache size.
    #[arg(long)]
    pub cache_size: Option<usize>,

    /// Bones per skin partition.
    #[arg(long)]
    pub max_bones: Option<usize>,

    /// Do not stitch strips together.
    #[arg(long)]
    pub no_stitch: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a config file.
    pub config: Option<PathBuf>,
}

/// `-v` selects debug, `-q` errors only; otherwise `KILN_LOG`, then
/// `RUST_LOG`, then warnings.
fn init_logging(global: &GlobalArgs) {
    let env = if std::env::var_os("KILN_LOG").is_some() {
        env_logger::Env::new().filter("KILN_LOG")
    } else {
        env_logger::Env::default().default_filter_or("warn")
    };
    let mut builder = env_logger::Builder::from_env(env);
    if global.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if global.quiet {
        builder.filter_level(log::LevelFilter::Error);
    }
    builder.format_timestamp(None);
    if let Err(e) = builder.try_init() {
        eprintln!("warning: logging unavailable: {e}");
    }
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Toast(ref args) => toast::run(args, &global),
        Command::Spells { format } => spells::run(format),
        Command::Diff {
            ref old,
            ref new,
            ref patch,
        } => patch::diff(old, new, patch, &global),
        Command::Apply {
            ref old,
            ref patch,
            ref new,
        } => patch::apply(old, patch, new, &global),
        Command::PatchDir {
            ref old_dir,
            ref new_dir,
            ref patch_dir,
        } => patch::patch_dir(old_dir, new_dir, patch_dir, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
