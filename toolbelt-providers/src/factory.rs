//! Name-keyed construction of providers.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::traits::{EncryptionProvider, ProviderArgs, ProviderError, ProviderResult, StorageProvider};
use crate::{local, memory, plaintext};

/// Function that builds a provider from its constructor arguments.
pub type Constructor<P> = fn(&ProviderArgs) -> ProviderResult<Box<P>>;

/// Factory for the storage family.
pub type StorageFactory = ProviderFactory<dyn StorageProvider>;

/// Factory for the encryption family.
pub type EncryptionFactory = ProviderFactory<dyn EncryptionProvider>;

/// Table mapping provider type names to constructors for one capability family.
///
/// The table is filled once, before first use, and never mutated afterwards.
/// Adding a backend means registering one more entry.
pub struct ProviderFactory<P: ?Sized> {
    family: &'static str,
    constructors: BTreeMap<&'static str, Constructor<P>>,
}

impl<P: ?Sized> ProviderFactory<P> {
    /// Creates an empty factory for the named family.
    #[must_use]
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            constructors: BTreeMap::new(),
        }
    }

    /// Registers a constructor under `type_name`, replacing any previous entry.
    #[must_use]
    pub fn register(mut self, type_name: &'static str, constructor: Constructor<P>) -> Self {
        self.constructors.insert(type_name, constructor);
        self
    }

    /// Returns the family this factory builds providers for.
    #[must_use]
    pub const fn family(&self) -> &'static str {
        self.family
    }

    /// Returns the registered type names in sorted order.
    pub fn types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }

    /// Builds the provider registered under `type_name`.
    ///
    /// `args` is forwarded unchanged; validating it is the backend's job.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownProviderType`] when nothing is
    /// registered under `type_name`, or whatever the backend constructor
    /// returns.
    pub fn make(&self, type_name: &str, args: &ProviderArgs) -> ProviderResult<Box<P>> {
        let constructor =
            self.constructors
                .get(type_name)
                .ok_or_else(|| ProviderError::UnknownProviderType {
                    family: self.family,
                    type_name: type_name.to_owned(),
                })?;

        debug!(family = self.family, type_name, "constructing provider");
        constructor(args)
    }
}

impl<P: ?Sized> Clone for ProviderFactory<P> {
    fn clone(&self) -> Self {
        Self {
            family: self.family,
            constructors: self.constructors.clone(),
        }
    }
}

impl<P: ?Sized> fmt::Debug for ProviderFactory<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("family", &self.family)
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderFactory<dyn StorageProvider> {
    /// Creates the storage factory with every built-in backend registered.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new("storage")
            .register(local::TYPE_NAME, local::LocalStorageProvider::construct)
            .register(memory::TYPE_NAME, memory::MemoryStorageProvider::construct)
    }
}

impl ProviderFactory<dyn EncryptionProvider> {
    /// Creates the encryption factory with every built-in backend registered.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new("encryption").register(
            plaintext::TYPE_NAME,
            plaintext::PlaintextEncryptionProvider::construct,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    fn counting(args: &ProviderArgs) -> ProviderResult<Box<dyn StorageProvider>> {
        CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
        memory::MemoryStorageProvider::construct(args)
    }

    #[test]
    fn builtin_storage_types_are_registered() {
        let factory = StorageFactory::builtin();
        assert_eq!(factory.family(), "storage");
        assert_eq!(factory.types().collect::<Vec<_>>(), ["local", "memory"]);
    }

    #[test]
    fn make_builds_registered_type() {
        let factory = StorageFactory::builtin();
        let provider = factory.make("memory", &ProviderArgs::new()).expect("provider");
        assert_eq!(provider.type_name(), "memory");

        let encryption = EncryptionFactory::builtin()
            .make("plaintext", &ProviderArgs::new())
            .expect("provider");
        assert_eq!(encryption.type_name(), "plaintext");
    }

    #[test]
    fn unknown_type_never_constructs() {
        let factory = StorageFactory::new("storage").register("counting", counting);
        let args = match json!({ "objects": {} }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };

        let err = factory.make("s3", &args).expect_err("unknown type");
        assert!(matches!(
            err,
            ProviderError::UnknownProviderType { family: "storage", ref type_name } if type_name == "s3"
        ));
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 0);

        factory.make("counting", &args).expect("registered type");
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backend_argument_errors_pass_through() {
        let factory = EncryptionFactory::builtin();
        let args = match json!({ "vault_url": "https://example" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };

        let err = factory.make("plaintext", &args).expect_err("unknown parameter");
        assert!(matches!(err, ProviderError::InvalidArguments { .. }));
    }
}
