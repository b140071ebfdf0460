//! Root configuration model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolbelt_providers::{
    EncryptionFactory, EncryptionProvider, ProviderArgs, StorageFactory, StorageProvider,
};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{FieldKind, Schema, ValidationErrors};

/// Returns the schema every root document is validated against.
///
/// Unknown top-level keys are dropped so that newer documents still load.
#[must_use]
pub fn root_schema() -> Schema {
    let encryption = Schema::new()
        .required("provider", FieldKind::String)
        .with_default("config", FieldKind::Mapping, json!({}));

    Schema::new()
        .ignore_unknown()
        .required("logging_config", FieldKind::Mapping)
        .optional("storage_providers", FieldKind::map_of(FieldKind::Mapping))
        .optional("encryption_provider", FieldKind::Nested(encryption))
        .with_default(
            "plugins_config_location",
            FieldKind::map_of(FieldKind::String),
            json!({}),
        )
        .optional("plugins_config", FieldKind::map_of(FieldKind::Mapping))
}

/// Type name and constructor arguments of the encryption provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncryptionProviderConfig {
    provider: String,
    #[serde(default)]
    config: ProviderArgs,
}

impl EncryptionProviderConfig {
    /// Creates a provider section.
    #[must_use]
    pub fn new(provider: impl Into<String>, config: ProviderArgs) -> Self {
        Self {
            provider: provider.into(),
            config,
        }
    }

    /// Returns the provider type name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the constructor arguments.
    #[must_use]
    pub fn config(&self) -> &ProviderArgs {
        &self.config
    }
}

/// Deserialized root configuration. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    logging_config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage_providers: Option<BTreeMap<String, ProviderArgs>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encryption_provider: Option<EncryptionProviderConfig>,
    #[serde(default)]
    plugins_config_location: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plugins_config: Option<BTreeMap<String, Map<String, Value>>>,
}

impl Config {
    /// Validates a parsed document and constructs the configuration.
    ///
    /// No logging is initialised; see [`crate::load`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] listing every field that does not
    /// match [`root_schema`].
    pub fn from_document(document: &Value, name: &str) -> ConfigResult<Self> {
        let validated = root_schema()
            .validate(document)
            .map_err(|errors| ConfigError::Validation {
                name: name.to_owned(),
                errors,
            })?;

        validated
            .construct()
            .map_err(|err| ConfigError::Validation {
                name: name.to_owned(),
                errors: ValidationErrors::single("<root>", err.to_string()),
            })
    }

    /// Parses, validates and constructs a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML and
    /// [`ConfigError::Validation`] for schema violations.
    pub fn from_yaml_str(text: &str, name: &str) -> ConfigResult<Self> {
        Self::from_yaml_slice(text.as_bytes(), name)
    }

    /// Same as [`Config::from_yaml_str`] for raw bytes.
    ///
    /// # Errors
    ///
    /// See [`Config::from_yaml_str`].
    pub fn from_yaml_slice(bytes: &[u8], name: &str) -> ConfigResult<Self> {
        let document: Value =
            serde_yaml::from_slice(bytes).map_err(|source| ConfigError::Parse {
                name: name.to_owned(),
                source,
            })?;
        Self::from_document(&document, name)
    }

    /// Serializes the configuration back to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if the YAML emitter fails.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|source| ConfigError::Serialize { source })
    }

    /// Installs process-wide logging from `logging_config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LoggingInit`] when the logging subsystem refuses
    /// the mapping.
    pub fn init_logging(&self) -> ConfigResult<()> {
        toolbelt_telemetry::init_logging(&self.logging_config)?;
        Ok(())
    }

    /// Returns the opaque logging mapping.
    #[must_use]
    pub fn logging_config(&self) -> &Map<String, Value> {
        &self.logging_config
    }

    /// Returns the configured storage providers, if the section was present.
    #[must_use]
    pub fn storage_providers(&self) -> Option<&BTreeMap<String, ProviderArgs>> {
        self.storage_providers.as_ref()
    }

    /// Returns the encryption provider section, if present.
    #[must_use]
    pub fn encryption_provider(&self) -> Option<&EncryptionProviderConfig> {
        self.encryption_provider.as_ref()
    }

    /// Returns every plugin configuration location override.
    #[must_use]
    pub fn plugins_config_location(&self) -> &BTreeMap<String, String> {
        &self.plugins_config_location
    }

    /// Returns the inline plugin sections, if the section was present.
    #[must_use]
    pub fn plugins_config(&self) -> Option<&BTreeMap<String, Map<String, Value>>> {
        self.plugins_config.as_ref()
    }

    /// Returns the override location for `plugin`, if one is configured.
    #[must_use]
    pub fn plugin_config_location(&self, plugin: &str) -> Option<&str> {
        self.plugins_config_location.get(plugin).map(String::as_str)
    }

    /// Returns the inline section for `plugin`, if one is configured.
    #[must_use]
    pub fn inline_plugin_config(&self, plugin: &str) -> Option<&Map<String, Value>> {
        self.plugins_config.as_ref()?.get(plugin)
    }

    /// Builds the storage provider configured under `name`.
    ///
    /// The key under `storage_providers` doubles as the provider type name;
    /// its mapping is passed to the constructor unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStorageProvider`] when `name` is not
    /// configured, or [`ConfigError::Provider`] when the factory fails.
    pub fn get_storage(
        &self,
        name: &str,
        factory: &StorageFactory,
    ) -> ConfigResult<Box<dyn StorageProvider>> {
        let Some(args) = self.storage_providers.as_ref().and_then(|p| p.get(name)) else {
            debug!(provider = name, "no configuration for storage provider");
            return Err(ConfigError::UnknownStorageProvider {
                name: name.to_owned(),
            });
        };
        Ok(factory.make(name, args)?)
    }

    /// Builds the configured encryption provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EncryptionNotConfigured`] when the section is
    /// absent, or [`ConfigError::Provider`] when the type is unknown or its
    /// constructor fails.
    pub fn get_encryption(
        &self,
        factory: &EncryptionFactory,
    ) -> ConfigResult<Box<dyn EncryptionProvider>> {
        let section = self
            .encryption_provider
            .as_ref()
            .ok_or(ConfigError::EncryptionNotConfigured)?;
        factory
            .make(section.provider(), section.config())
            .map_err(|err| {
                debug!(provider = section.provider(), error = %err, "encryption provider not valid");
                ConfigError::from(err)
            })
    }
}
