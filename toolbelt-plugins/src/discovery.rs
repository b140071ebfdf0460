//! Ways of enumerating the installed plugins.

use crate::plugin::Plugin;
use crate::registry::{RegistryError, RegistryResult};

/// Source of plugin records, queried once at startup.
pub trait PluginDiscovery {
    /// Returns the discovered plugins in discovery order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPlugin`]
    /// when a plugin record cannot be built.
    fn discover(&self) -> RegistryResult<Vec<Plugin>>;
}

/// Link-time registration entry collected by [`InstalledPlugins`].
///
/// Submit one with [`register_plugin!`](crate::register_plugin).
#[derive(Debug)]
pub struct PluginRegistration {
    build: fn() -> toolbelt_primitives::Result<Plugin>,
}

impl PluginRegistration {
    /// Wraps a function that builds the plugin record.
    #[must_use]
    pub const fn new(build: fn() -> toolbelt_primitives::Result<Plugin>) -> Self {
        Self { build }
    }

    /// Builds the plugin record.
    ///
    /// # Errors
    ///
    /// Returns the error raised while building the plugin's manifest.
    pub fn build(&self) -> toolbelt_primitives::Result<Plugin> {
        (self.build)()
    }
}

inventory::collect!(PluginRegistration);

/// Registers a plugin with [`InstalledPlugins`] from anywhere in the binary.
///
/// ```ignore
/// fn store_plugin() -> toolbelt_primitives::Result<toolbelt_plugins::Plugin> { /* ... */ }
///
/// toolbelt_plugins::register_plugin!(store_plugin);
/// ```
#[macro_export]
macro_rules! register_plugin {
    ($build:path) => {
        $crate::inventory::submit! {
            $crate::PluginRegistration::new($build)
        }
    };
}

/// Every plugin linked into the running binary through [`register_plugin!`](crate::register_plugin).
///
/// Order follows the linker and is not guaranteed to be stable across builds.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstalledPlugins;

impl PluginDiscovery for InstalledPlugins {
    fn discover(&self) -> RegistryResult<Vec<Plugin>> {
        inventory::iter::<PluginRegistration>
            .into_iter()
            .map(|registration| registration.build().map_err(RegistryError::from))
            .collect()
    }
}

/// A fixed list of plugins, in the order given.
#[derive(Clone, Debug, Default)]
pub struct StaticPlugins {
    plugins: Vec<Plugin>,
}

impl StaticPlugins {
    /// Wraps an explicit plugin list.
    #[must_use]
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self { plugins }
    }
}

impl PluginDiscovery for StaticPlugins {
    fn discover(&self) -> RegistryResult<Vec<Plugin>> {
        Ok(self.plugins.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use toolbelt_primitives::{Error, PluginManifest, PluginManifestBuilder, PluginName};

    use crate::context::ExecutionContext;
    use crate::plugin::CommandResult;

    fn linked_plugin() -> toolbelt_primitives::Result<Plugin> {
        let manifest = PluginManifest::builder(PluginName::new("linked")?)
            .version("0.1.0")
            .and_then(PluginManifestBuilder::build)?;
        Ok(Plugin::new(manifest, |_ctx: ExecutionContext| -> CommandResult { Ok(()) }))
    }

    fn unversioned_plugin() -> toolbelt_primitives::Result<Plugin> {
        let manifest = PluginManifest::builder(PluginName::new("unversioned")?).build()?;
        Ok(Plugin::new(manifest, |_ctx: ExecutionContext| -> CommandResult { Ok(()) }))
    }

    crate::register_plugin!(linked_plugin);

    #[test]
    fn installed_plugins_include_registered_entries() {
        let names: Vec<_> = InstalledPlugins
            .discover()
            .expect("discover")
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect();
        assert!(names.contains(&"linked".to_owned()));
    }

    #[test]
    fn broken_registration_is_an_error_not_a_panic() {
        let registration = PluginRegistration::new(unversioned_plugin);
        let err = registration.build().expect_err("missing version");
        assert!(matches!(err, Error::InvalidManifest { .. }));

        let err = RegistryError::from(err);
        assert!(err.to_string().starts_with("invalid plugin registration: "));
    }

    #[test]
    fn static_plugins_keep_order() {
        let plugin = linked_plugin().expect("plugin");
        let discovery = StaticPlugins::new(vec![plugin.clone(), plugin]);
        assert_eq!(discovery.discover().expect("discover").len(), 2);
    }
}
