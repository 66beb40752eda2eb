//! Parsing and validation of `kiln.toml` configuration files.
//!
//! The file is optional. It supplies defaults for the toaster (spell
//! pipeline, worker count, file filters) and for the geometry kernels (cache
//! size, partition bounds, hull precision). Command-line flags override it.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_config, load_config_file, load_config_from_str, validate_config, CONFIG_FILE_NAME,
};
pub use types::*;
