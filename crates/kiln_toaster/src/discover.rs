//! Input file discovery.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ToastError;

/// An input file and its path relative to the input it was found under.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// The file as it is read.
    pub path: PathBuf,
    /// The path below the directory given on the command line, or the bare
    /// file name for files given directly.
    pub relative: PathBuf,
}

/// Include and exclude patterns matched against file paths.
#[derive(Clone, Debug, Default)]
pub struct FileFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, ToastError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| ToastError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

impl FileFilter {
    /// Compiles the patterns. An empty include list admits every file.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ToastError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Returns `true` if the file should be processed.
    pub fn allows(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        let included = self.include.is_empty() || self.include.iter().any(|r| r.is_match(&text));
        included && !self.exclude.iter().any(|r| r.is_match(&text))
    }
}

fn walk_dir(root: &Path, dir: &Path, files: &mut Vec<SourceFile>) -> Result<(), ToastError> {
    let io = |source| ToastError::Input {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_dir() {
            walk_dir(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(SourceFile {
                relative: relative.to_path_buf(),
                path,
            });
        }
    }
    Ok(())
}

/// Expands the inputs into the files to process, sorted by path with
/// duplicates removed. Directories are walked recursively.
pub fn discover(inputs: &[PathBuf], filter: &FileFilter) -> Result<Vec<SourceFile>, ToastError> {
    let mut files = Vec::new();
    for input in inputs {
        let meta = std::fs::metadata(input).map_err(|source| ToastError::Input {
            path: input.clone(),
            source,
        })?;
        if meta.is_dir() {
            walk_dir(input, input, &mut files)?;
        } else {
            let relative = input
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| input.clone());
            files.push(SourceFile {
                path: input.clone(),
                relative,
            });
        }
    }
    files.retain(|f| {
        let keep = filter.allows(&f.path);
        if !keep {
            log::debug!("filtered out {}", f.path.display());
        }
        keep
    });
    files.sort();
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}
