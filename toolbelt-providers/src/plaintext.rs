//! Identity encryption provider for local development.

use serde::Deserialize;

use crate::traits::{
    EncryptionEnvelope, EncryptionProvider, ProviderArgs, ProviderError, ProviderResult, parse_args,
};

/// Type name under which this backend is registered.
pub const TYPE_NAME: &str = "plaintext";

fn default_key_id() -> String {
    TYPE_NAME.to_owned()
}

/// Constructor arguments for [`PlaintextEncryptionProvider`].
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaintextConfig {
    /// Key identifier stamped on every envelope.
    #[serde(default = "default_key_id")]
    pub key_id: String,
}

/// Encryption provider that leaves payloads unchanged.
///
/// Envelopes still carry a key id so that a payload written with this
/// provider is refused by one configured with a different id.
#[derive(Clone, Debug)]
pub struct PlaintextEncryptionProvider {
    key_id: String,
}

impl PlaintextEncryptionProvider {
    /// Creates a provider stamping envelopes with `key_id`.
    #[must_use]
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
        }
    }

    /// Factory constructor.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidArguments`] when `args` does not match
    /// [`PlaintextConfig`].
    pub fn construct(args: &ProviderArgs) -> ProviderResult<Box<dyn EncryptionProvider>> {
        let config: PlaintextConfig = parse_args(TYPE_NAME, args)?;
        Ok(Box::new(Self::new(config.key_id)))
    }
}

impl EncryptionProvider for PlaintextEncryptionProvider {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn encrypt(&self, plaintext: &[u8]) -> ProviderResult<EncryptionEnvelope> {
        Ok(EncryptionEnvelope::new(self.key_id.clone(), plaintext.to_vec()))
    }

    fn decrypt(&self, envelope: &EncryptionEnvelope) -> ProviderResult<Vec<u8>> {
        if envelope.key_id() != self.key_id {
            return Err(ProviderError::backend(format!(
                "envelope key `{}` does not match provider key `{}`",
                envelope.key_id(),
                self.key_id
            )));
        }
        Ok(envelope.ciphertext().to_vec())
    }
}
