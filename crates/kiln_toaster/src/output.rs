//! Where each processed file is written.

use std::path::{Path, PathBuf};

use kiln_patch::patch_path_for;

use crate::discover::SourceFile;
use crate::options::ToastOptions;

/// Maps input files to output paths: optional remapping from a source to a
/// destination directory, then prefix and suffix around the file stem, then
/// `.patch` when patches are written instead of files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputPlan {
    source_dir: Option<PathBuf>,
    dest_dir: Option<PathBuf>,
    prefix: String,
    suffix: String,
    create_patch: bool,
}

impl OutputPlan {
    /// Extracts the output settings from the run options.
    pub fn from_options(options: &ToastOptions) -> Self {
        Self {
            source_dir: options.source_dir.clone(),
            dest_dir: options.dest_dir.clone(),
            prefix: options.prefix.clone(),
            suffix: options.suffix.clone(),
            create_patch: options.create_patch,
        }
    }

    /// Returns `true` if outputs are patches.
    pub fn creates_patches(&self) -> bool {
        self.create_patch
    }

    /// The output path for `file`, or why there is none.
    pub fn output_for(&self, file: &SourceFile) -> Result<PathBuf, String> {
        let base = match &self.dest_dir {
            Some(dest) => {
                let relative = match &self.source_dir {
                    Some(source) => file.path.strip_prefix(source).map_err(|_| {
                        format!(
                            "{} is not under the source directory {}",
                            file.path.display(),
                            source.display()
                        )
                    })?,
                    None => file.relative.as_path(),
                };
                dest.join(relative)
            }
            None => file.path.clone(),
        };
        let named = self.rename(&base);
        Ok(if self.create_patch {
            patch_path_for(&named)
        } else {
            named
        })
    }

    fn rename(&self, path: &Path) -> PathBuf {
        if self.prefix.is_empty() && self.suffix.is_empty() {
            return path.to_path_buf();
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut name = format!("{}{stem}{}", self.prefix, self.suffix);
        if let Some(ext) = path.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        path.with_file_name(name)
    }
}
