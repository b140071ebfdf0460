//! Configuration management for toolbelt.
//!
//! The root document is YAML. It is parsed, checked against the root
//! [`schema::Schema`], constructed into an immutable [`Config`], and finally
//! used to install process-wide logging.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod loader;
mod model;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{DEFAULT_CONFIG_NAME, load, load_or_report};
pub use model::{Config, EncryptionProviderConfig, root_schema};
pub use schema::{FieldError, FieldKind, Schema, Validated, ValidationErrors};
