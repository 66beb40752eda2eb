//! Block locations inside an asset file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a diagnostic was raised: an asset file, a block index, and the
/// human-readable ownership path from a root down to that block.
///
/// Any part may be missing. Loader diagnostics have no path yet, and
/// diagnostics are usually emitted before the toaster attaches the file name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// The asset file, once known.
    pub file: Option<String>,
    /// Index of the block in the file.
    pub block: Option<u32>,
    /// Ownership path such as `Node:Scene[0]/Geometry[3]`.
    pub path: Option<String>,
}

impl Location {
    /// A location that points nowhere in particular.
    pub const NONE: Location = Location {
        file: None,
        block: None,
        path: None,
    };

    /// Creates a location for a block index.
    pub fn block(index: u32) -> Self {
        Self {
            file: None,
            block: Some(index),
            path: None,
        }
    }

    /// Sets the ownership path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the file name.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Returns `true` if no part of the location is known.
    pub fn is_none(&self) -> bool {
        self.file.is_none() && self.block.is_none() && self.path.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if let Some(file) = &self.file {
            write!(f, "{file}")?;
            wrote = true;
        }
        if let Some(block) = self.block {
            write!(f, "#{block}")?;
            wrote = true;
        }
        if let Some(path) = &self.path {
            if wrote {
                write!(f, " ")?;
            }
            write!(f, "({path})")?;
        }
        Ok(())
    }
}
