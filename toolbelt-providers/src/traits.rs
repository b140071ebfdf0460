//! Shared provider traits and data structures.

use std::fmt;
use std::io;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result alias used by provider implementations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Constructor arguments for a provider, keyed by parameter name.
pub type ProviderArgs = Map<String, Value>;

/// Error type shared by provider implementations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No constructor is registered for the requested type name.
    #[error("unknown {family} provider type `{type_name}`")]
    UnknownProviderType {
        /// Provider family (`storage`, `encryption`).
        family: &'static str,
        /// The type name that was requested.
        type_name: String,
    },

    /// The constructor arguments did not match what the backend expects.
    #[error("invalid arguments for provider `{provider}`: {reason}")]
    InvalidArguments {
        /// Provider type name.
        provider: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The supplied object path cannot be used with this backend.
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Nothing is stored at the requested path.
    #[error("no object stored at `{path}`")]
    NotFound {
        /// The path that was requested.
        path: String,
    },

    /// Underlying I/O failure while talking to the backend.
    #[error("provider i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: io::Error,
    },

    /// Backend-specific failure.
    #[error("provider backend error: {reason}")]
    Backend {
        /// Additional context about the failure.
        reason: String,
    },
}

impl ProviderError {
    /// Convenience constructor for argument errors.
    #[must_use]
    pub fn invalid_arguments(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for path errors.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for backend failures.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Deserializes constructor arguments into a backend's typed config.
///
/// Backends declare their config with `#[serde(deny_unknown_fields)]` so an
/// unexpected parameter name is rejected the same way a missing one is.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidArguments`] when the arguments do not
/// match `T`.
pub fn parse_args<T>(provider: &str, args: &ProviderArgs) -> ProviderResult<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|err| ProviderError::invalid_arguments(provider, err.to_string()))
}

/// Backend capable of storing and retrieving opaque objects by path.
pub trait StorageProvider: fmt::Debug + Send + Sync {
    /// Returns the provider type name this instance was built from.
    fn type_name(&self) -> &'static str;

    /// Appends the bytes stored at `path` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] when nothing is stored at `path`,
    /// or a backend-specific error on connectivity failures.
    fn retrieve(&self, path: &str, destination: &mut dyn io::Write) -> ProviderResult<()>;

    /// Stores `data` at `path`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns a backend-specific error when the write fails.
    fn store(&self, path: &str, data: &[u8]) -> ProviderResult<()>;

    /// Lists the paths that start with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns a backend-specific error when the listing fails.
    fn list(&self, prefix: &str) -> ProviderResult<Vec<String>>;
}

/// Encrypted payload plus the information needed to decrypt it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionEnvelope {
    key_id: String,
    ciphertext: Vec<u8>,
}

impl EncryptionEnvelope {
    /// Creates an envelope for ciphertext produced under `key_id`.
    #[must_use]
    pub fn new(key_id: impl Into<String>, ciphertext: Vec<u8>) -> Self {
        Self {
            key_id: key_id.into(),
            ciphertext,
        }
    }

    /// Returns the identifier of the key used to produce the ciphertext.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the ciphertext bytes.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Backend capable of encrypting and decrypting payloads.
pub trait EncryptionProvider: fmt::Debug + Send + Sync {
    /// Returns the provider type name this instance was built from.
    fn type_name(&self) -> &'static str;

    /// Encrypts `plaintext`.
    ///
    /// # Errors
    ///
    /// Returns a backend-specific error when encryption fails.
    fn encrypt(&self, plaintext: &[u8]) -> ProviderResult<EncryptionEnvelope>;

    /// Decrypts an envelope produced by [`EncryptionProvider::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns a backend-specific error when the envelope was produced with a
    /// key this provider does not hold.
    fn decrypt(&self, envelope: &EncryptionEnvelope) -> ProviderResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct BucketArgs {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
    }

    fn args(value: Value) -> ProviderArgs {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn parse_args_maps_named_parameters() {
        let parsed: BucketArgs =
            parse_args("bucket", &args(json!({ "bucket": "configs" }))).expect("args");
        assert_eq!(parsed.bucket, "configs");
        assert!(parsed.region.is_none());
    }

    #[test]
    fn parse_args_rejects_unknown_parameters() {
        let err = parse_args::<BucketArgs>(
            "bucket",
            &args(json!({ "bucket": "configs", "colour": "red" })),
        )
        .expect_err("unknown parameter should fail");

        assert!(matches!(err, ProviderError::InvalidArguments { provider, .. } if provider == "bucket"));
    }

    #[test]
    fn parse_args_rejects_missing_parameters() {
        let err = parse_args::<BucketArgs>("bucket", &ProviderArgs::new())
            .expect_err("missing parameter should fail");
        assert!(err.to_string().contains("bucket"));
    }
}
