//! Per-plugin configuration resolution.
//!
//! A plugin's configuration is read from exactly one place: the override
//! location under `plugins_config_location` when there is one, otherwise its
//! inline section under `plugins_config`. Whatever is found is validated
//! against the plugin's schema before it is handed out.

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use toolbelt_config::{Config, ConfigError, ValidationErrors};
use toolbelt_providers::StorageFactory;
use tracing::{debug, error, warn};

use crate::context::{ConfigSource, PluginConfig};
use crate::plugin::Plugin;

/// Result alias for configuration resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Reasons a plugin's configuration could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The root configuration failed to load earlier in the run.
    #[error("cannot configure plugin `{plugin}`: root configuration not loaded")]
    ConfigNotLoaded {
        /// Plugin name.
        plugin: String,
    },

    /// Resolution was requested for a plugin that declared no schema.
    #[error("plugin `{plugin}` does not declare a configuration schema")]
    NoSchemaDeclared {
        /// Plugin name.
        plugin: String,
    },

    /// The override location is not of the form `<provider>://<path>`.
    #[error("invalid config location `{location}` for plugin `{plugin}`: expected `<provider>://<path>`")]
    MalformedOverrideUri {
        /// Plugin name.
        plugin: String,
        /// The location as written.
        location: String,
    },

    /// Neither an override location nor an inline section exists.
    #[error("no configuration found for plugin `{plugin}`")]
    NoConfigForPlugin {
        /// Plugin name.
        plugin: String,
    },

    /// The override document could not be retrieved, decoded or parsed.
    #[error("unable to read config for plugin `{plugin}` from `{location}`: {reason}")]
    OverrideFetch {
        /// Plugin name.
        plugin: String,
        /// The location that was read.
        location: String,
        /// Human-readable cause.
        reason: String,
    },

    /// The configuration does not match the plugin's schema.
    #[error("error validating config `{section}` for plugin `{plugin}`: {errors}")]
    Validation {
        /// Plugin name.
        plugin: String,
        /// Where the configuration came from, e.g. `plugins_config.store`.
        section: String,
        /// Every violation found.
        errors: ValidationErrors,
    },

    /// The storage provider named by the override could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResolveError {
    /// Renders the error as the lines shown to the user.
    ///
    /// Validation failures produce a header followed by one line per field;
    /// everything else is a single line.
    #[must_use]
    pub fn report(&self) -> Vec<String> {
        match self {
            Self::Validation {
                plugin,
                section,
                errors,
            } => {
                let mut lines = vec![format!(
                    "Error validating config '{section}' for plugin '{plugin}':"
                )];
                lines.extend(errors.fields().iter().map(|field| format!("  {field}")));
                lines
            }
            other => vec![other.to_string()],
        }
    }
}

/// A parsed `<provider>://<path>` override location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideLocation {
    provider: String,
    path: String,
}

impl OverrideLocation {
    /// Splits `location` at the first `://`.
    ///
    /// Returns `None` when the separator is missing or the provider part is
    /// empty.
    #[must_use]
    pub fn parse(location: &str) -> Option<Self> {
        let (provider, path) = location.split_once("://")?;
        if provider.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.to_owned(),
            path: path.to_owned(),
        })
    }

    /// Returns the storage provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the path inside the provider.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for OverrideLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.provider, self.path)
    }
}

/// Resolves plugin configurations against one root configuration.
#[derive(Clone, Copy, Debug)]
pub struct PluginConfigResolver<'a> {
    config: Option<&'a Config>,
    storage: &'a StorageFactory,
}

impl<'a> PluginConfigResolver<'a> {
    /// Creates a resolver. `config` is `None` when the root configuration
    /// failed to load.
    #[must_use]
    pub fn new(config: Option<&'a Config>, storage: &'a StorageFactory) -> Self {
        Self { config, storage }
    }

    /// Finds, fetches and validates the configuration for `plugin`.
    ///
    /// # Errors
    ///
    /// Returns the [`ResolveError`] for the first step that fails. Nothing is
    /// retrieved from storage unless the override location parses and names
    /// a configured provider.
    pub fn resolve(&self, plugin: &Plugin) -> ResolveResult<PluginConfig> {
        let name = plugin.name();

        let Some(config) = self.config else {
            warn!(plugin = %name, "root configuration not loaded; cannot configure plugin");
            return Err(ResolveError::ConfigNotLoaded {
                plugin: name.to_string(),
            });
        };

        let Some(schema) = plugin.config_schema() else {
            return Err(ResolveError::NoSchemaDeclared {
                plugin: name.to_string(),
            });
        };

        let (raw, source, section) = if let Some(location) =
            config.plugin_config_location(name.as_str())
        {
            let raw = self.fetch_override(config, name.as_str(), location)?;
            let source = ConfigSource::Override {
                location: location.to_owned(),
            };
            (raw, source, location.to_owned())
        } else if let Some(inline) = config.inline_plugin_config(name.as_str()) {
            (
                Value::Object(inline.clone()),
                ConfigSource::Inline,
                format!("plugins_config.{name}"),
            )
        } else {
            debug!(plugin = %name, "no configuration found for plugin");
            return Err(ResolveError::NoConfigForPlugin {
                plugin: name.to_string(),
            });
        };

        match schema.validate(&raw) {
            Ok(values) => {
                debug!(plugin = %name, section = %section, "plugin configuration resolved");
                Ok(PluginConfig::new(name.clone(), source, values))
            }
            Err(errors) => {
                debug!(plugin = %name, section = %section, %errors, "plugin configuration invalid");
                Err(ResolveError::Validation {
                    plugin: name.to_string(),
                    section,
                    errors,
                })
            }
        }
    }

    /// Same as [`resolve`](Self::resolve), logging the failure once and
    /// returning `None` instead of an error.
    #[must_use]
    pub fn resolve_or_report(&self, plugin: &Plugin) -> Option<PluginConfig> {
        match self.resolve(plugin) {
            Ok(config) => Some(config),
            // `resolve` already warned about the missing root configuration.
            Err(ResolveError::ConfigNotLoaded { .. }) => None,
            Err(err) => {
                error!(plugin = %plugin.name(), error = %err, "unable to resolve plugin configuration");
                None
            }
        }
    }

    fn fetch_override(&self, config: &Config, plugin: &str, location: &str) -> ResolveResult<Value> {
        let parsed = OverrideLocation::parse(location).ok_or_else(|| {
            debug!(plugin, location, "malformed config location");
            ResolveError::MalformedOverrideUri {
                plugin: plugin.to_owned(),
                location: location.to_owned(),
            }
        })?;

        let storage = config.get_storage(parsed.provider(), self.storage)?;
        let fetch_error = |reason: String| {
            debug!(plugin, location, %reason, "unable to read plugin config override");
            ResolveError::OverrideFetch {
                plugin: plugin.to_owned(),
                location: location.to_owned(),
                reason,
            }
        };

        let mut buffer = Vec::new();
        storage
            .retrieve(parsed.path(), &mut buffer)
            .map_err(|err| fetch_error(err.to_string()))?;
        let text = String::from_utf8(buffer).map_err(|err| fetch_error(err.to_string()))?;

        debug!(plugin, provider = parsed.provider(), path = parsed.path(), "fetched plugin config override");
        serde_yaml::from_str(&text).map_err(|err| fetch_error(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use toolbelt_config::{FieldKind, Schema};
    use toolbelt_primitives::{PluginManifest, PluginManifestBuilder, PluginName};
    use toolbelt_providers::memory::MemoryStorageProvider;
    use toolbelt_providers::{ProviderArgs, ProviderResult, StorageProvider};

    use crate::context::ExecutionContext;
    use crate::plugin::CommandResult;
    use crate::test_support::warnings_during;

    fn plugin(name: &str, schema: Option<Schema>) -> Plugin {
        let manifest = PluginManifest::builder(PluginName::new(name).expect("name"))
            .version("1.0.0")
            .and_then(PluginManifestBuilder::build)
            .expect("manifest");
        let plugin = Plugin::new(manifest, |_ctx: ExecutionContext| -> CommandResult { Ok(()) });
        match schema {
            Some(schema) => plugin.with_config_schema(schema),
            None => plugin,
        }
    }

    fn int_k() -> Option<Schema> {
        Some(Schema::new().required("k", FieldKind::Integer))
    }

    fn config(yaml: &str) -> Config {
        Config::from_yaml_str(yaml, "test.yaml").expect("config")
    }

    fn resolve(config: &Config, plugin: &Plugin) -> ResolveResult<PluginConfig> {
        let storage = StorageFactory::builtin();
        PluginConfigResolver::new(Some(config), &storage).resolve(plugin)
    }

    #[test]
    fn inline_section_matching_schema_resolves() {
        let cfg = config("logging_config: {}\nplugins_config:\n  foo:\n    k: 1\n");
        let resolved = resolve(&cfg, &plugin("foo", int_k())).expect("resolved");

        assert_eq!(resolved.values(), json!({ "k": 1 }).as_object().expect("object"));
        assert_eq!(resolved.source(), &ConfigSource::Inline);
    }

    #[test]
    fn schema_violation_names_the_field() {
        let cfg = config("logging_config: {}\nplugins_config:\n  foo:\n    k: 1\n");
        let schema = Schema::new().required("k", FieldKind::String);

        match resolve(&cfg, &plugin("foo", Some(schema))) {
            Err(ResolveError::Validation {
                plugin,
                section,
                errors,
            }) => {
                assert_eq!(plugin, "foo");
                assert_eq!(section, "plugins_config.foo");
                assert!(errors.messages("k").is_some());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    static S3_BUILT: AtomicUsize = AtomicUsize::new(0);
    static MEMORY_BUILT: AtomicUsize = AtomicUsize::new(0);

    fn counted_s3(args: &ProviderArgs) -> ProviderResult<Box<dyn StorageProvider>> {
        S3_BUILT.fetch_add(1, Ordering::SeqCst);
        MemoryStorageProvider::construct(args)
    }

    fn counted_memory(args: &ProviderArgs) -> ProviderResult<Box<dyn StorageProvider>> {
        MEMORY_BUILT.fetch_add(1, Ordering::SeqCst);
        MemoryStorageProvider::construct(args)
    }

    #[test]
    fn unconfigured_override_provider_is_rejected_without_building_it() {
        let storage = StorageFactory::new("storage").register("s3", counted_s3);
        let target = plugin("foo", int_k());

        let cfg = config("logging_config: {}\nplugins_config_location:\n  foo: s3://cfg/foo.yaml\n");
        let err = PluginConfigResolver::new(Some(&cfg), &storage)
            .resolve(&target)
            .expect_err("s3");
        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::UnknownStorageProvider { name }) if name == "s3"
        ));
        assert_eq!(S3_BUILT.load(Ordering::SeqCst), 0);

        let configured = config(
            "logging_config: {}\nstorage_providers:\n  s3:\n    objects:\n      cfg/foo.yaml: 'k: 2'\nplugins_config_location:\n  foo: s3://cfg/foo.yaml\n",
        );
        let resolved = PluginConfigResolver::new(Some(&configured), &storage)
            .resolve(&target)
            .expect("resolved");
        assert_eq!(resolved.get("k"), Some(&json!(2)));
        assert_eq!(S3_BUILT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn override_without_separator_fails_before_storage_is_built() {
        let storage = StorageFactory::new("storage").register("memory", counted_memory);
        let cfg = config(
            "logging_config: {}\nstorage_providers:\n  memory: {}\nplugins_config_location:\n  foo: noscheme-path\n",
        );

        let err = PluginConfigResolver::new(Some(&cfg), &storage)
            .resolve(&plugin("foo", int_k()))
            .expect_err("malformed");
        assert!(matches!(
            err,
            ResolveError::MalformedOverrideUri { location, .. } if location == "noscheme-path"
        ));
        assert_eq!(MEMORY_BUILT.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn override_wins_over_inline_section() {
        let cfg = config(
            r"
logging_config: {}
storage_providers:
  memory:
    objects:
      cfg/foo.yaml: 'k: 7'
plugins_config_location:
  foo: memory://cfg/foo.yaml
plugins_config:
  foo:
    k: not-an-integer
",
        );
        let resolved = resolve(&cfg, &plugin("foo", int_k())).expect("resolved");

        assert_eq!(resolved.get("k"), Some(&json!(7)));
        assert_eq!(
            resolved.source(),
            &ConfigSource::Override {
                location: "memory://cfg/foo.yaml".into()
            }
        );
    }

    #[test]
    fn missing_from_both_sections_fails() {
        let cfg = config("logging_config: {}\nplugins_config:\n  bar:\n    k: 1\n");
        let err = resolve(&cfg, &plugin("foo", int_k())).expect_err("absent");
        assert!(matches!(err, ResolveError::NoConfigForPlugin { plugin } if plugin == "foo"));
    }

    #[test]
    fn absent_root_config_fails_first() {
        let storage = StorageFactory::builtin();
        let resolver = PluginConfigResolver::new(None, &storage);
        let target = plugin("foo", None);

        assert!(matches!(
            resolver.resolve(&target),
            Err(ResolveError::ConfigNotLoaded { .. })
        ));
        assert!(resolver.resolve_or_report(&target).is_none());
    }

    #[test]
    fn plugin_without_schema_cannot_be_resolved() {
        let cfg = config("logging_config: {}\nplugins_config:\n  foo:\n    k: 1\n");
        let err = resolve(&cfg, &plugin("foo", None)).expect_err("no schema");
        assert!(matches!(err, ResolveError::NoSchemaDeclared { .. }));
    }

    #[test]
    fn missing_override_object_is_a_fetch_error() {
        let cfg = config(
            "logging_config: {}\nstorage_providers:\n  memory: {}\nplugins_config_location:\n  foo: memory://cfg/missing.yaml\n",
        );
        let err = resolve(&cfg, &plugin("foo", int_k())).expect_err("missing");
        assert!(matches!(
            err,
            ResolveError::OverrideFetch { location, .. } if location == "memory://cfg/missing.yaml"
        ));
    }

    #[test]
    fn malformed_override_document_is_a_fetch_error() {
        let cfg = config(
            r"
logging_config: {}
storage_providers:
  memory:
    objects:
      cfg/foo.yaml: 'k: [unclosed'
plugins_config_location:
  foo: memory://cfg/foo.yaml
",
        );
        let err = resolve(&cfg, &plugin("foo", int_k())).expect_err("malformed");
        assert!(matches!(err, ResolveError::OverrideFetch { .. }));
    }

    #[test]
    fn failures_are_reported_once() {
        let storage = StorageFactory::builtin();
        let cfg = config("logging_config: {}\nplugins_config:\n  foo:\n    k: one\n");
        let resolver = PluginConfigResolver::new(Some(&cfg), &storage);

        let (result, lines) = warnings_during(|| resolver.resolve(&plugin("foo", int_k())));
        assert!(matches!(result, Err(ResolveError::Validation { .. })));
        assert!(lines.is_empty(), "resolve logged {lines:?}");

        let (missing, lines) =
            warnings_during(|| resolver.resolve_or_report(&plugin("bar", int_k())));
        assert!(missing.is_none());
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("no configuration found for plugin `bar`"));

        let unloaded = PluginConfigResolver::new(None, &storage);
        let (missing, lines) =
            warnings_during(|| unloaded.resolve_or_report(&plugin("foo", int_k())));
        assert!(missing.is_none());
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("root configuration not loaded"));
    }

    #[test]
    fn validation_report_has_one_line_per_field() {
        let cfg = config("logging_config: {}\nplugins_config:\n  foo:\n    k: one\n    extra: 1\n");
        let err = resolve(&cfg, &plugin("foo", int_k())).expect_err("invalid");

        let report = err.report();
        assert_eq!(report[0], "Error validating config 'plugins_config.foo' for plugin 'foo':");
        assert_eq!(report.len(), 3, "{report:?}");
        assert!(report[1..].iter().all(|line| line.starts_with("  ")));
        assert!(report.iter().any(|line| line.starts_with("  k: ")));
        assert!(report.iter().any(|line| line.starts_with("  extra: ")));

        let single = ResolveError::NoConfigForPlugin { plugin: "foo".into() }.report();
        assert_eq!(single, ["no configuration found for plugin `foo`"]);
    }

    #[test]
    fn override_location_parsing() {
        let parsed = OverrideLocation::parse("local://plugins/store.yaml").expect("parsed");
        assert_eq!(parsed.provider(), "local");
        assert_eq!(parsed.path(), "plugins/store.yaml");
        assert_eq!(parsed.to_string(), "local://plugins/store.yaml");

        assert!(OverrideLocation::parse("noscheme-path").is_none());
        assert!(OverrideLocation::parse("://path").is_none());
    }
}
