//! Registry of discovered plugins, keyed by invocation name.

use std::collections::HashMap;

use thiserror::Error;
use toolbelt_primitives::PluginName;
use tracing::debug;

use crate::discovery::PluginDiscovery;
use crate::plugin::Plugin;

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors produced while populating the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two plugins were discovered under the same name.
    #[error("plugin `{name}` is already registered")]
    DuplicatePlugin {
        /// Name of the offending plugin.
        name: PluginName,
    },

    /// A registered plugin could not build its record.
    #[error("invalid plugin registration: {source}")]
    InvalidPlugin {
        /// Source [`toolbelt_primitives::Error`].
        #[from]
        source: toolbelt_primitives::Error,
    },
}

/// Plugins in discovery order plus a name index.
///
/// Filled once at startup and only read afterwards.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
    index: HashMap<PluginName, usize>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from everything `discovery` reports.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPlugin`] if a plugin record cannot be
    /// built and [`RegistryError::DuplicatePlugin`] if two plugins share a name.
    pub fn discover(discovery: &dyn PluginDiscovery) -> RegistryResult<Self> {
        let mut registry = Self::new();
        for plugin in discovery.discover()? {
            registry.register(plugin)?;
        }
        Ok(registry)
    }

    /// Adds a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePlugin`] if the name is already present.
    pub fn register(&mut self, plugin: Plugin) -> RegistryResult<()> {
        let name = plugin.name().clone();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicatePlugin { name });
        }

        debug!(
            plugin = %name,
            version = plugin.manifest().version(),
            configurable = plugin.config_schema().is_some(),
            "registered plugin"
        );
        self.index.insert(name, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    /// Returns the plugin names in discovery order.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name().as_str())
            .collect()
    }

    /// Returns the plugin invoked as `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.index.get(name).map(|&position| &self.plugins[position])
    }

    /// Iterates over the plugins in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
