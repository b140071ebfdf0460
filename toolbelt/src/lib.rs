//! Operations toolbelt facade.
//!
//! Bundles the toolbelt crates behind feature flags so plugin authors and
//! embedders can depend on one crate and enable only the layers they need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use toolbelt_primitives as primitives;

/// Storage and encryption providers (enabled by `providers` feature).
#[cfg(feature = "providers")]
pub use toolbelt_providers as providers;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use toolbelt_telemetry as telemetry;

/// Root configuration loading and schemas (enabled by `config` feature).
#[cfg(feature = "config")]
pub use toolbelt_config as config;

/// Plugin discovery, configuration resolution and dispatch (enabled by
/// `plugins` feature).
#[cfg(feature = "plugins")]
pub use toolbelt_plugins as plugins;
