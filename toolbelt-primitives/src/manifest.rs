//! Plugin metadata shown in the command listing.

use serde::{Deserialize, Serialize};

use crate::{Error, PluginName, Result};

const MAX_SUMMARY_LEN: usize = 120;

/// Human-readable description of a plugin's identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    name: PluginName,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

impl PluginManifest {
    /// Starts building a [`PluginManifest`].
    #[must_use]
    pub fn builder(name: PluginName) -> PluginManifestBuilder {
        PluginManifestBuilder {
            name,
            version: None,
            summary: None,
        }
    }

    /// Returns the plugin invocation name.
    #[must_use]
    pub fn name(&self) -> &PluginName {
        &self.name
    }

    /// Returns the version string of the plugin build.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the optional one-line summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

/// Builder for [`PluginManifest`].
#[derive(Debug)]
pub struct PluginManifestBuilder {
    name: PluginName,
    version: Option<String>,
    summary: Option<String>,
}

impl PluginManifestBuilder {
    /// Sets the version string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] when the version string is empty.
    pub fn version(mut self, version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(Error::InvalidManifest {
                reason: "manifest version cannot be empty".into(),
            });
        }
        self.version = Some(version);
        Ok(self)
    }

    /// Sets the one-line summary printed next to the plugin name in help output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] when the summary spans several lines
    /// or exceeds the maximum supported length.
    pub fn summary(mut self, summary: impl Into<String>) -> Result<Self> {
        let summary = summary.into();
        if summary.contains('\n') {
            return Err(Error::InvalidManifest {
                reason: "manifest summary must be a single line".into(),
            });
        }
        if summary.len() > MAX_SUMMARY_LEN {
            return Err(Error::InvalidManifest {
                reason: format!("manifest summary length must be <= {MAX_SUMMARY_LEN}"),
            });
        }
        self.summary = Some(summary);
        Ok(self)
    }

    /// Consumes the builder and returns the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] if the version was never provided.
    pub fn build(self) -> Result<PluginManifest> {
        let version = self.version.ok_or_else(|| Error::InvalidManifest {
            reason: "manifest version must be provided".into(),
        })?;

        Ok(PluginManifest {
            name: self.name,
            version,
            summary: self.summary,
        })
    }
}
