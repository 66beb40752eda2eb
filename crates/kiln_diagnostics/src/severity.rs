//! How serious a diagnostic is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic. Variants are declared from mildest to worst so
/// `Ord` can be used for thresholds such as `--quiet`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A measurement or summary, such as the ATVR of a mesh.
    Note,
    /// Input was repaired or a fallback was taken; the file was still processed.
    Warning,
    /// A block or a whole file could not be processed.
    Error,
}

impl Severity {
    /// The lowercase label used in rendered output and JSON reports.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Returns `true` for [`Severity::Error`].
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_threshold_keeps_only_errors() {
        let kept: Vec<Severity> = [Severity::Note, Severity::Error, Severity::Warning]
            .into_iter()
            .filter(|s| *s >= Severity::Error)
            .collect();
        assert_eq!(kept, vec![Severity::Error]);
    }

    #[test]
    fn labels_match_serde_names() {
        for s in [Severity::Note, Severity::Warning, Severity::Error] {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.label()));
        }
    }

    #[test]
    fn only_error_is_error() {
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
        assert!(!Severity::Note.is_error());
    }
}
