//! Plugins shipped with the binary.

use std::io::{self, Write};

use anyhow::Context;
use toolbelt::plugins::{CommandError, CommandResult, ExecutionContext, Plugin};
use toolbelt::primitives::{self, PluginManifest, PluginName};
use toolbelt::providers::{EncryptionFactory, StorageFactory};

/// `toolbelt providers`: prints the provider types this binary can build.
fn providers_plugin() -> primitives::Result<Plugin> {
    let manifest = PluginManifest::builder(PluginName::new("providers")?)
        .version(env!("CARGO_PKG_VERSION"))?
        .summary("List the storage and encryption provider types")?
        .build()?;

    Ok(Plugin::new(manifest, list_providers))
}

fn list_providers(ctx: ExecutionContext) -> CommandResult {
    if let Some(extra) = ctx.args().first() {
        return Err(CommandError::usage(format!("unexpected argument `{extra}`")));
    }

    let storage = StorageFactory::builtin();
    let encryption = EncryptionFactory::builtin();

    let mut out = io::stdout().lock();
    for (family, types) in [
        (storage.family(), storage.types().collect::<Vec<_>>()),
        (encryption.family(), encryption.types().collect::<Vec<_>>()),
    ] {
        writeln!(out, "{family}: {}", types.join(", ")).context("writing provider list")?;
    }
    Ok(())
}

toolbelt::plugins::register_plugin!(providers_plugin);
