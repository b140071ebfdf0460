//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Config;

/// File name used when no `--config-file` is given.
pub const DEFAULT_CONFIG_NAME: &str = "toolbelt.yaml";

/// Loads, validates and constructs the root configuration, then installs
/// process-wide logging from its `logging_config`.
///
/// Logging is only touched once the document is known to be valid.
///
/// # Errors
///
/// Returns [`ConfigError::Io`], [`ConfigError::Parse`],
/// [`ConfigError::Validation`] or [`ConfigError::LoggingInit`].
pub fn load(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path.display().to_string();
    let config = Config::from_yaml_slice(&raw, &name)?;
    config.init_logging()?;

    debug!(path = %name, "configuration loaded");
    Ok(config)
}

/// Loads the configuration, printing any failure to stderr.
///
/// Returns `None` on failure so the caller can pick an exit status.
#[must_use]
pub fn load_or_report(path: impl AsRef<Path>) -> Option<Config> {
    match load(path) {
        Ok(config) => Some(config),
        Err(err) => {
            for line in err.report() {
                eprintln!("{line}");
            }
            None
        }
    }
}
