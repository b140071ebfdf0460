//! Plugin discovery, configuration resolution and dispatch.
//!
//! Plugins are collected once at startup through a [`PluginDiscovery`]
//! implementation into a [`PluginRegistry`]. The [`Dispatcher`] looks a
//! plugin up by name, resolves its configuration with a
//! [`PluginConfigResolver`] when the plugin declares a schema, and hands the
//! result to the command inside an [`ExecutionContext`].

#![warn(missing_docs, clippy::pedantic)]

mod context;
mod discovery;
mod dispatcher;
mod plugin;
mod registry;
mod resolver;
#[cfg(test)]
mod test_support;

pub use context::{ConfigSource, ExecutionContext, PluginConfig};
pub use discovery::{InstalledPlugins, PluginDiscovery, PluginRegistration, StaticPlugins};
pub use dispatcher::{DispatchError, DispatchResult, Dispatcher};
pub use plugin::{CommandError, CommandResult, Plugin, PluginCommand};
pub use registry::{PluginRegistry, RegistryError, RegistryResult};
pub use resolver::{OverrideLocation, PluginConfigResolver, ResolveError, ResolveResult};

#[doc(hidden)]
pub use inventory;
