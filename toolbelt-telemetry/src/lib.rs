//! Observability utilities for toolbelt.
//!
//! The root configuration carries an opaque `logging_config` mapping. This
//! crate gives that mapping its meaning and installs the matching global
//! `tracing` subscriber.

#![warn(missing_docs, clippy::pedantic)]

mod logging;

pub use logging::{
    LogFormat, LogWriter, LoggingConfig, TelemetryError, TelemetryResult, init_logging,
};
