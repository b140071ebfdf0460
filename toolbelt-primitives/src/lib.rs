//! Core shared types for the toolbelt plugin dispatcher.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod manifest;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Invocation token identifying a plugin on the command line.
pub use ids::PluginName;
/// Descriptive metadata advertised by a plugin.
pub use manifest::{PluginManifest, PluginManifestBuilder};
