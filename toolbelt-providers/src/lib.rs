//! Pluggable storage and encryption backends.
//!
//! Each backend implements one of the capability traits defined in
//! [`traits`]. Configuration refers to backends by a type name only; the
//! [`factory`] module is the single place where that name is turned into a
//! constructed provider.

#![warn(missing_docs, clippy::pedantic)]

pub mod factory;
pub mod local;
pub mod memory;
pub mod plaintext;
pub mod traits;

pub use factory::{Constructor, EncryptionFactory, ProviderFactory, StorageFactory};
pub use traits::{
    EncryptionEnvelope, EncryptionProvider, ProviderArgs, ProviderError, ProviderResult,
    StorageProvider,
};
