//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use toolbelt_providers::ProviderError;
use toolbelt_telemetry::TelemetryError;

use crate::schema::ValidationErrors;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors emitted while loading the root configuration or building the
/// providers it references.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("error opening config file `{}`: {source}", path.display())]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Source [`std::io::Error`].
        source: io::Error,
    },

    /// The file is not well-formed YAML.
    #[error("error in config file `{name}`: {source}")]
    Parse {
        /// Human-readable name of the document, usually its path.
        name: String,
        /// Source [`serde_yaml::Error`].
        source: serde_yaml::Error,
    },

    /// The document is well-formed but does not match the schema.
    #[error("error validating config `{name}`: {errors}")]
    Validation {
        /// Human-readable name of the document.
        name: String,
        /// Every violation found.
        errors: ValidationErrors,
    },

    /// `logging_config` passed validation but the logging subsystem refused it.
    #[error("unable to load logging config: {source}")]
    LoggingInit {
        /// Source [`TelemetryError`].
        #[from]
        source: TelemetryError,
    },

    /// The requested storage provider has no entry under `storage_providers`.
    #[error("no configuration for storage provider `{name}`")]
    UnknownStorageProvider {
        /// The name that was requested.
        name: String,
    },

    /// No `encryption_provider` section was supplied.
    #[error("no encryption provider configured")]
    EncryptionNotConfigured,

    /// The provider factory refused to build a provider.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The configuration could not be written back out as YAML.
    #[error("unable to serialize config: {source}")]
    Serialize {
        /// Source [`serde_yaml::Error`].
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    /// Renders the error as the lines shown to the user.
    ///
    /// Validation failures produce a header followed by one line per field;
    /// everything else is a single line.
    #[must_use]
    pub fn report(&self) -> Vec<String> {
        match self {
            Self::Validation { name, errors } => {
                let mut lines = vec![format!("Error validating config '{name}':")];
                lines.extend(errors.fields().iter().map(|field| format!("  {field}")));
                lines
            }
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_report_has_one_line_per_field() {
        let mut errors = ValidationErrors::default();
        errors.push("logging_config", "missing required field");
        errors.push("plugins_config.store", "expected a mapping, found a string");

        let report = ConfigError::Validation {
            name: "toolbelt.yaml".into(),
            errors,
        }
        .report();

        assert_eq!(
            report,
            [
                "Error validating config 'toolbelt.yaml':",
                "  logging_config: missing required field",
                "  plugins_config.store: expected a mapping, found a string",
            ]
        );
    }

    #[test]
    fn other_errors_report_a_single_line() {
        let report = ConfigError::UnknownStorageProvider { name: "s3".into() }.report();
        assert_eq!(report, ["no configuration for storage provider `s3`"]);
    }
}
