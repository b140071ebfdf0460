//! Filesystem-backed storage provider.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::traits::{ProviderArgs, ProviderError, ProviderResult, StorageProvider, parse_args};

/// Type name under which this backend is registered.
pub const TYPE_NAME: &str = "local";

/// Constructor arguments for [`LocalStorageProvider`].
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalStorageConfig {
    /// Directory that object paths are resolved against.
    pub root: PathBuf,
}

/// Storage provider that keeps objects as files below a root directory.
#[derive(Clone, Debug)]
pub struct LocalStorageProvider {
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Creates a provider rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Factory constructor.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidArguments`] when `args` does not match
    /// [`LocalStorageConfig`].
    pub fn construct(args: &ProviderArgs) -> ProviderResult<Box<dyn StorageProvider>> {
        let config: LocalStorageConfig = parse_args(TYPE_NAME, args)?;
        Ok(Box::new(Self::new(config.root)))
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> ProviderResult<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() {
            return Err(ProviderError::invalid_path(path, "path cannot be empty"));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(ProviderError::invalid_path(
                        path,
                        "path cannot contain `..` components",
                    ));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ProviderError::invalid_path(path, "path must be relative"));
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl StorageProvider for LocalStorageProvider {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn retrieve(&self, path: &str, destination: &mut dyn Write) -> ProviderResult<()> {
        let full = self.resolve(path)?;
        debug!(path = %full.display(), "retrieving object");
        let mut file = fs::File::open(&full).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ProviderError::NotFound { path: path.into() },
            _ => ProviderError::from(err),
        })?;
        io::copy(&mut file, destination)?;
        Ok(())
    }

    fn store(&self, path: &str, data: &[u8]) -> ProviderResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %full.display(), bytes = data.len(), "storing object");
        fs::write(&full, data)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> ProviderResult<Vec<String>> {
        let mut paths = Vec::new();
        if self.root.is_dir() {
            collect_files(&self.root, &self.root, &mut paths)?;
        }
        paths.retain(|path| path.starts_with(prefix));
        paths.sort();
        Ok(paths)
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let joined = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(joined);
        }
    }
    Ok(())
}
