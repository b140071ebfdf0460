//! Values handed to a plugin command when it runs.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use toolbelt_config::Validated;
use toolbelt_primitives::PluginName;

use crate::plugin::{CommandError, CommandResult};

/// Where a plugin's configuration was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// The plugin's section under `plugins_config` in the root document.
    Inline,
    /// A document fetched through a storage provider.
    Override {
        /// The `<provider>://<path>` location it was fetched from.
        location: String,
    },
}

/// A plugin configuration that passed the plugin's schema.
#[derive(Clone, Debug, PartialEq)]
pub struct PluginConfig {
    plugin: PluginName,
    source: ConfigSource,
    values: Validated,
}

impl PluginConfig {
    /// Wraps a validated mapping for `plugin`.
    #[must_use]
    pub fn new(plugin: PluginName, source: ConfigSource, values: Validated) -> Self {
        Self {
            plugin,
            source,
            values,
        }
    }

    /// Returns the plugin the configuration belongs to.
    #[must_use]
    pub fn plugin(&self) -> &PluginName {
        &self.plugin
    }

    /// Returns where the configuration was read from.
    #[must_use]
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Returns the validated mapping.
    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        self.values.as_map()
    }

    /// Returns a single value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.as_map().get(key)
    }

    /// Builds the plugin's typed configuration from the validated mapping.
    ///
    /// # Errors
    ///
    /// Returns the `serde` error when `T` does not fit the mapping.
    pub fn deserialize<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        self.values.clone().construct()
    }
}

/// Everything a plugin command receives for one invocation.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    plugin: PluginName,
    config: Option<PluginConfig>,
    args: Vec<String>,
}

impl ExecutionContext {
    /// Constructs a context.
    #[must_use]
    pub fn new(plugin: PluginName, config: Option<PluginConfig>, args: Vec<String>) -> Self {
        Self {
            plugin,
            config,
            args,
        }
    }

    /// Returns the name the plugin was invoked as.
    #[must_use]
    pub fn plugin(&self) -> &PluginName {
        &self.plugin
    }

    /// Returns the injected configuration, if the plugin declared a schema.
    #[must_use]
    pub fn config(&self) -> Option<&PluginConfig> {
        self.config.as_ref()
    }

    /// Returns the arguments that followed the plugin name.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the injected configuration or an error if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingConfig`] for plugins dispatched without
    /// configuration.
    pub fn require_config(&self) -> CommandResult<&PluginConfig> {
        self.config.as_ref().ok_or_else(|| CommandError::MissingConfig {
            plugin: self.plugin.to_string(),
        })
    }

    /// Builds the typed configuration `T` from the injected configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingConfig`] or
    /// [`CommandError::InvalidConfig`].
    pub fn typed_config<T>(&self) -> CommandResult<T>
    where
        T: DeserializeOwned,
    {
        self.require_config()?
            .deserialize()
            .map_err(|source| CommandError::InvalidConfig {
                type_name: std::any::type_name::<T>(),
                source,
            })
    }
}
