//! Plugin records and the command capability.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use toolbelt_config::Schema;
use toolbelt_primitives::{PluginManifest, PluginName};

use crate::context::ExecutionContext;

/// Result alias for plugin commands.
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Errors returned by plugin commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command-line arguments were not understood.
    #[error("usage: {reason}")]
    Usage {
        /// Human-readable explanation.
        reason: String,
    },

    /// The command asked for its configuration but none was injected.
    #[error("plugin `{plugin}` has no configuration")]
    MissingConfig {
        /// Plugin name.
        plugin: String,
    },

    /// The injected configuration does not fit the command's typed config.
    #[error("configuration does not match `{type_name}`: {source}")]
    InvalidConfig {
        /// Rust type the command tried to build.
        type_name: &'static str,
        /// Source [`serde_json::Error`].
        source: serde_json::Error,
    },

    /// Any other failure reported by the command.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    /// Creates a usage error from the supplied reason.
    #[must_use]
    pub fn usage(reason: impl Into<String>) -> Self {
        Self::Usage {
            reason: reason.into(),
        }
    }
}

/// Executable entry point of a plugin.
pub trait PluginCommand: Send + Sync {
    /// Runs the command with its execution context.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the command fails.
    fn run(&self, ctx: ExecutionContext) -> CommandResult;
}

impl<F> PluginCommand for F
where
    F: Fn(ExecutionContext) -> CommandResult + Send + Sync,
{
    fn run(&self, ctx: ExecutionContext) -> CommandResult {
        (self)(ctx)
    }
}

/// A discovered subcommand: its manifest, command, and optional config schema.
#[derive(Clone)]
pub struct Plugin {
    manifest: PluginManifest,
    command: Arc<dyn PluginCommand>,
    config_schema: Option<Schema>,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", self.name())
            .field("version", &self.manifest.version())
            .field("has_config_schema", &self.config_schema.is_some())
            .finish_non_exhaustive()
    }
}

impl Plugin {
    /// Creates a plugin that takes no configuration.
    #[must_use]
    pub fn new<C>(manifest: PluginManifest, command: C) -> Self
    where
        C: PluginCommand + 'static,
    {
        Self {
            manifest,
            command: Arc::new(command),
            config_schema: None,
        }
    }

    /// Declares the schema the plugin's configuration section must satisfy.
    ///
    /// A plugin with a schema is never run without a validated configuration.
    #[must_use]
    pub fn with_config_schema(mut self, schema: Schema) -> Self {
        self.config_schema = Some(schema);
        self
    }

    /// Returns the invocation name.
    #[must_use]
    pub fn name(&self) -> &PluginName {
        self.manifest.name()
    }

    /// Returns the manifest.
    #[must_use]
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Returns the configuration schema, if the plugin declared one.
    #[must_use]
    pub fn config_schema(&self) -> Option<&Schema> {
        self.config_schema.as_ref()
    }

    /// Runs the plugin's command.
    ///
    /// # Errors
    ///
    /// Propagates the command's [`CommandError`].
    pub fn run(&self, ctx: ExecutionContext) -> CommandResult {
        self.command.run(ctx)
    }
}
