//! In-process storage provider.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::RwLock;

use serde::Deserialize;

use crate::traits::{ProviderArgs, ProviderError, ProviderResult, StorageProvider, parse_args};

/// Type name under which this backend is registered.
pub const TYPE_NAME: &str = "memory";

/// Constructor arguments for [`MemoryStorageProvider`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryStorageConfig {
    /// Objects to seed the store with, keyed by path.
    #[serde(default)]
    pub objects: BTreeMap<String, String>,
}

/// Storage provider holding objects in a process-local map.
///
/// Nothing outlives the instance. Useful for embedding fixtures directly in
/// a configuration document.
#[derive(Debug, Default)]
pub struct MemoryStorageProvider {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorageProvider {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `objects`.
    #[must_use]
    pub fn with_objects(objects: BTreeMap<String, String>) -> Self {
        let objects = objects
            .into_iter()
            .map(|(path, text)| (path, text.into_bytes()))
            .collect();
        Self {
            objects: RwLock::new(objects),
        }
    }

    /// Factory constructor.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidArguments`] when `args` does not match
    /// [`MemoryStorageConfig`].
    pub fn construct(args: &ProviderArgs) -> ProviderResult<Box<dyn StorageProvider>> {
        let config: MemoryStorageConfig = parse_args(TYPE_NAME, args)?;
        Ok(Box::new(Self::with_objects(config.objects)))
    }
}

fn poisoned() -> ProviderError {
    ProviderError::backend("memory store lock poisoned")
}

impl StorageProvider for MemoryStorageProvider {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn retrieve(&self, path: &str, destination: &mut dyn Write) -> ProviderResult<()> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        let data = objects
            .get(path)
            .ok_or_else(|| ProviderError::NotFound { path: path.into() })?;
        destination.write_all(data)?;
        Ok(())
    }

    fn store(&self, path: &str, data: &[u8]) -> ProviderResult<()> {
        if path.is_empty() {
            return Err(ProviderError::invalid_path(path, "path cannot be empty"));
        }
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(path.to_owned(), data.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> ProviderResult<Vec<String>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }
}
