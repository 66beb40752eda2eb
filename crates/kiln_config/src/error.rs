//! Errors raised while reading `kiln.toml`.

use std::path::PathBuf;

/// A configuration that could not be read, parsed or accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The file is not valid TOML or has keys kiln does not know.
    #[error("{origin}: {message}")]
    Parse {
        /// File path, or `<string>` for in-memory input.
        origin: String,
        /// The TOML parser's message.
        message: String,
    },

    /// A value is out of range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted key, such as `kernels.cache_size`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// The offending key for [`ConfigError::Invalid`].
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Invalid { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("assets/kiln.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "cannot read assets/kiln.toml: denied");
        assert_eq!(err.field(), None);
    }

    #[test]
    fn invalid_value_names_the_key() {
        let err = ConfigError::invalid("kernels.cache_size", "must be at least 1");
        assert_eq!(err.to_string(), "invalid value for kernels.cache_size: must be at least 1");
        assert_eq!(err.field(), Some("kernels.cache_size"));
    }
}
