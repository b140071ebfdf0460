//! Shared error definitions for toolbelt primitives.

use thiserror::Error;

/// Result alias used throughout the primitives crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Plugin name failed validation.
    #[error("invalid plugin name `{name}`: {reason}")]
    InvalidPluginName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Plugin manifest failed validation.
    #[error("invalid plugin manifest: {reason}")]
    InvalidManifest {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
