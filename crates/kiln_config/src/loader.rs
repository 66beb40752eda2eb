//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::KilnConfig;
use std::path::Path;

const STRING_ORIGIN: &str = "<string>";

/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Loads `<dir>/kiln.toml`, falling back to defaults when the file is absent.
pub fn load_config(dir: &Path) -> Result<KilnConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        log::debug!("no {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
        return Ok(KilnConfig::default());
    }
    load_config_file(&path)
}

/// Loads and validates a configuration from an explicit path.
pub fn load_config_file(path: &Path) -> Result<KilnConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loading configuration from {}", path.display());
    parse(&content, &path.display().to_string())
}

/// Parses and validates a `kiln.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    parse(content, STRING_ORIGIN)
}

fn parse(content: &str, origin: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        origin: origin.to_string(),
        message: e.message().to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks ranges the types alone cannot express.
pub fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    if config.toaster.jobs == Some(0) {
        return Err(ConfigError::invalid("toaster.jobs", "must be at least 1"));
    }
    let k = &config.kernels;
    if k.cache_size == 0 {
        return Err(ConfigError::invalid("kernels.cache_size", "must be at least 1"));
    }
    if k.max_bones_per_partition == 0 {
        return Err(ConfigError::invalid(
            "kernels.max_bones_per_partition",
            "must be at least 1",
        ));
    }
    if (1..3).contains(&k.max_vertices_per_partition) {
        return Err(ConfigError::invalid(
            "kernels.max_vertices_per_partition",
            "must be 0 (unbounded) or at least 3",
        ));
    }
    if !(k.hull_precision.is_finite() && k.hull_precision > 0.0) {
        return Err(ConfigError::invalid(
            "kernels.hull_precision",
            "must be a positive number",
        ));
    }
    Ok(())
}
