//! Routes an invocation to its plugin with the plugin's configuration injected.

use thiserror::Error;
use toolbelt_config::Config;
use toolbelt_providers::StorageFactory;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::plugin::CommandError;
use crate::registry::PluginRegistry;
use crate::resolver::{PluginConfigResolver, ResolveError};

/// Result alias for dispatch.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors produced while dispatching a plugin.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No plugin is registered under the requested name.
    #[error("unknown command `{name}` (available: {})", available.join(", "))]
    UnknownCommand {
        /// The requested name.
        name: String,
        /// Registered names in discovery order.
        available: Vec<String>,
    },

    /// The plugin declares a schema and its configuration did not resolve.
    #[error("plugin `{plugin}` not run: {source}")]
    Configuration {
        /// Plugin name.
        plugin: String,
        /// Source [`ResolveError`].
        source: ResolveError,
    },

    /// The plugin ran and failed.
    #[error("plugin `{plugin}` failed: {source}")]
    Command {
        /// Plugin name.
        plugin: String,
        /// Source [`CommandError`].
        source: CommandError,
    },
}

impl DispatchError {
    /// Returns the process exit status for this failure.
    ///
    /// Unknown commands are usage errors (2); everything else is 1.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownCommand { .. } => 2,
            Self::Configuration { .. } | Self::Command { .. } => 1,
        }
    }

    /// Renders the error as the lines shown to the user.
    ///
    /// Configuration failures defer to [`ResolveError::report`] so schema
    /// violations get one line per field.
    #[must_use]
    pub fn report(&self) -> Vec<String> {
        match self {
            Self::Configuration { source, .. } => source.report(),
            other => vec![other.to_string()],
        }
    }
}

/// Owns the registry and the root configuration for one process run.
#[derive(Debug)]
pub struct Dispatcher {
    registry: PluginRegistry,
    config: Option<Config>,
    storage: StorageFactory,
}

impl Dispatcher {
    /// Creates a dispatcher. `config` is `None` when the root configuration
    /// failed to load; schema-less plugins can still be dispatched.
    #[must_use]
    pub fn new(registry: PluginRegistry, config: Option<Config>, storage: StorageFactory) -> Self {
        Self {
            registry,
            config,
            storage,
        }
    }

    /// Returns the plugin registry.
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Returns the root configuration, if it loaded.
    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Runs the plugin invoked as `name` with `args`.
    ///
    /// Plugins that declare a schema only run once their configuration
    /// resolved and validated.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownCommand`],
    /// [`DispatchError::Configuration`] or [`DispatchError::Command`].
    pub fn dispatch(&self, name: &str, args: Vec<String>) -> DispatchResult<()> {
        let Some(plugin) = self.registry.get(name) else {
            return Err(DispatchError::UnknownCommand {
                name: name.to_owned(),
                available: self.registry.list().into_iter().map(str::to_owned).collect(),
            });
        };

        let config = if plugin.config_schema().is_some() {
            let resolver = PluginConfigResolver::new(self.config.as_ref(), &self.storage);
            let resolved = resolver
                .resolve(plugin)
                .map_err(|source| DispatchError::Configuration {
                    plugin: name.to_owned(),
                    source,
                })?;
            Some(resolved)
        } else {
            None
        };

        debug!(plugin = name, configured = config.is_some(), args = args.len(), "dispatching plugin");
        let ctx = ExecutionContext::new(plugin.name().clone(), config, args);
        plugin.run(ctx).map_err(|source| {
            debug!(plugin = name, error = %source, "plugin command failed");
            DispatchError::Command {
                plugin: name.to_owned(),
                source,
            }
        })
    }
}
