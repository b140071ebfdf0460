//! Logging configuration and global subscriber installation.

use std::io::{self, IsTerminal};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised when a logging configuration cannot be applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    /// The mapping did not have the expected shape.
    #[error("invalid logging configuration: {reason}")]
    InvalidConfig {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The `level` key is not a recognised level.
    #[error("unknown log level `{level}`")]
    InvalidLevel {
        /// The offending level string.
        level: String,
    },

    /// The filter directives could not be parsed.
    #[error("invalid log filter: {reason}")]
    InvalidFilter {
        /// Parser error message.
        reason: String,
    },
}

/// Output layout of log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Default single-line format with span context.
    #[default]
    Full,
    /// Shorter single-line format.
    Compact,
    /// Multi-line human-oriented format.
    Pretty,
}

/// Stream that log lines are written to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogWriter {
    /// Standard error.
    #[default]
    Stderr,
    /// Standard output.
    Stdout,
}

/// Typed view of the root configuration's `logging_config` mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default maximum level when no filter is given.
    pub level: String,
    /// `EnvFilter` directives; overrides `level` and `RUST_LOG`.
    pub filter: Option<String>,
    /// Line layout.
    pub format: LogFormat,
    /// Emit ANSI colour codes. When unset, colour is used only if the
    /// output stream is a terminal.
    pub ansi: Option<bool>,
    /// Include the event target in each line.
    pub target: bool,
    /// Output stream.
    pub writer: LogWriter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            format: LogFormat::default(),
            ansi: None,
            target: true,
            writer: LogWriter::default(),
        }
    }
}

impl LoggingConfig {
    /// Interprets an opaque `logging_config` mapping.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] on unknown keys or values of
    /// the wrong type.
    pub fn from_map(map: &Map<String, Value>) -> TelemetryResult<Self> {
        serde_json::from_value(Value::Object(map.clone())).map_err(|err| {
            TelemetryError::InvalidConfig {
                reason: err.to_string(),
            }
        })
    }

    /// Parses `level` into a [`LevelFilter`].
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidLevel`] for anything other than
    /// `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub fn level_filter(&self) -> TelemetryResult<LevelFilter> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| TelemetryError::InvalidLevel {
                level: self.level.clone(),
            })
    }

    /// Builds the event filter: explicit `filter`, else `RUST_LOG`, else `level`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidLevel`] or
    /// [`TelemetryError::InvalidFilter`] when either source does not parse.
    pub fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let level = self.level_filter()?;
        let filter = match &self.filter {
            Some(directives) => EnvFilter::try_new(directives).map_err(|err| {
                TelemetryError::InvalidFilter {
                    reason: err.to_string(),
                }
            })?,
            None => EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env()
                .map_err(|err| TelemetryError::InvalidFilter {
                    reason: err.to_string(),
                })?,
        };
        Ok(filter)
    }

    /// Returns whether log lines carry ANSI colour codes.
    #[must_use]
    pub fn ansi_enabled(&self) -> bool {
        self.ansi.unwrap_or_else(|| match self.writer {
            LogWriter::Stderr => io::stderr().is_terminal(),
            LogWriter::Stdout => io::stdout().is_terminal(),
        })
    }

    fn fmt_layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_ansi(self.ansi_enabled())
            .with_target(self.target)
            .with_writer(writer);
        match self.format {
            LogFormat::Full => layer.boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
        }
    }

    /// Installs the global subscriber described by this configuration.
    ///
    /// Returns `false` when another global subscriber was already installed;
    /// that subscriber is kept.
    ///
    /// # Errors
    ///
    /// Returns an error when the filter cannot be built. Nothing is installed
    /// in that case.
    pub fn install(&self) -> TelemetryResult<bool> {
        let filter = self.env_filter()?;
        let layer = match self.writer {
            LogWriter::Stderr => self.fmt_layer(io::stderr),
            LogWriter::Stdout => self.fmt_layer(io::stdout),
        };

        match tracing_subscriber::registry().with(layer).with(filter).try_init() {
            Ok(()) => {
                debug!(level = %self.level, format = ?self.format, "logging initialised");
                Ok(true)
            }
            Err(err) => {
                debug!(error = %err, "global subscriber already installed, keeping it");
                Ok(false)
            }
        }
    }
}

/// Interprets `logging_config` and installs the process-wide subscriber.
///
/// # Errors
///
/// Returns a [`TelemetryError`] when the mapping is well-formed YAML but not
/// usable as a logging configuration.
pub fn init_logging(logging_config: &Map<String, Value>) -> TelemetryResult<()> {
    LoggingConfig::from_map(logging_config)?.install()?;
    Ok(())
}
