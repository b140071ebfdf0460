use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use toolbelt::config::{FieldKind, Schema, load};
use toolbelt::plugins::{
    CommandResult, ConfigSource, DispatchError, Dispatcher, ExecutionContext, Plugin,
    PluginRegistry, ResolveError, StaticPlugins,
};
use toolbelt::primitives::{PluginManifest, PluginManifestBuilder, PluginName};
use toolbelt::providers::StorageFactory;

#[derive(Debug, Deserialize, PartialEq)]
struct StoreConfig {
    bucket: String,
    retries: u32,
}

type Seen = Arc<Mutex<Vec<(Option<ConfigSource>, Vec<String>)>>>;

fn manifest(name: &str) -> PluginManifest {
    PluginManifest::builder(PluginName::new(name).expect("name"))
        .version("0.1.0")
        .and_then(PluginManifestBuilder::build)
        .expect("manifest")
}

fn store_plugin(seen: &Seen, typed: &Arc<Mutex<Option<StoreConfig>>>) -> Plugin {
    let seen = Arc::clone(seen);
    let typed = Arc::clone(typed);
    Plugin::new(manifest("store"), move |ctx: ExecutionContext| -> CommandResult {
        let config: StoreConfig = ctx.typed_config()?;
        *typed.lock().expect("typed") = Some(config);
        seen.lock()
            .expect("seen")
            .push((ctx.config().map(|c| c.source().clone()), ctx.args().to_vec()));
        Ok(())
    })
    .with_config_schema(
        Schema::new()
            .required("bucket", FieldKind::String)
            .with_default("retries", FieldKind::Integer, serde_json::json!(3)),
    )
}

fn echo_plugin(seen: &Seen) -> Plugin {
    let seen = Arc::clone(seen);
    Plugin::new(manifest("echo"), move |ctx: ExecutionContext| -> CommandResult {
        seen.lock()
            .expect("seen")
            .push((ctx.config().map(|c| c.source().clone()), ctx.args().to_vec()));
        Ok(())
    })
}

fn write_root(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("toolbelt.yaml");
    fs::write(&path, body).expect("write root config");
    path
}

fn dispatcher(path: &Path, plugins: Vec<Plugin>) -> Dispatcher {
    let config = load(path).expect("root config");
    let registry = PluginRegistry::discover(&StaticPlugins::new(plugins)).expect("registry");
    Dispatcher::new(registry, Some(config), StorageFactory::builtin())
}

#[test]
fn override_is_fetched_from_local_storage() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::create_dir_all(dir.path().join("plugins")).expect("mkdir");
    fs::write(dir.path().join("plugins/store.yaml"), "bucket: archive\n").expect("override");

    let root = write_root(
        dir.path(),
        &format!(
            "logging_config:\n  level: error\nstorage_providers:\n  local:\n    root: '{}'\nplugins_config_location:\n  store: local://plugins/store.yaml\nplugins_config:\n  store:\n    bucket: inline\n",
            dir.path().display()
        ),
    );

    let seen = Seen::default();
    let typed = Arc::new(Mutex::new(None));
    let dispatcher = dispatcher(&root, vec![store_plugin(&seen, &typed), echo_plugin(&seen)]);

    dispatcher
        .dispatch("store", vec!["sync".into(), "--dry-run".into()])
        .expect("store runs");

    assert_eq!(
        *typed.lock().expect("typed"),
        Some(StoreConfig {
            bucket: "archive".into(),
            retries: 3
        })
    );
    assert_eq!(
        seen.lock().expect("seen").as_slice(),
        [(
            Some(ConfigSource::Override {
                location: "local://plugins/store.yaml".into()
            }),
            vec!["sync".to_owned(), "--dry-run".to_owned()]
        )]
    );
}

#[test]
fn inline_section_is_used_without_override() {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = write_root(
        dir.path(),
        "logging_config:\n  level: error\nplugins_config:\n  store:\n    bucket: inline\n    retries: 5\n",
    );

    let seen = Seen::default();
    let typed = Arc::new(Mutex::new(None));
    let dispatcher = dispatcher(&root, vec![store_plugin(&seen, &typed)]);

    dispatcher.dispatch("store", Vec::new()).expect("store runs");
    assert_eq!(
        *typed.lock().expect("typed"),
        Some(StoreConfig {
            bucket: "inline".into(),
            retries: 5
        })
    );
    assert_eq!(seen.lock().expect("seen")[0].0, Some(ConfigSource::Inline));
}

#[test]
fn override_cannot_escape_storage_root() {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = write_root(
        dir.path(),
        &format!(
            "logging_config:\n  level: error\nstorage_providers:\n  local:\n    root: '{}'\nplugins_config_location:\n  store: local://../secrets.yaml\n",
            dir.path().display()
        ),
    );

    let seen = Seen::default();
    let typed = Arc::new(Mutex::new(None));
    let dispatcher = dispatcher(&root, vec![store_plugin(&seen, &typed)]);

    let err = dispatcher.dispatch("store", Vec::new()).expect_err("traversal");
    assert_eq!(err.exit_code(), 1);
    assert!(matches!(
        err,
        DispatchError::Configuration {
            source: ResolveError::OverrideFetch { .. },
            ..
        }
    ));
    assert!(seen.lock().expect("seen").is_empty());
}

#[test]
fn unconfigured_plugin_is_never_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = write_root(dir.path(), "logging_config:\n  level: error\n");

    let seen = Seen::default();
    let typed = Arc::new(Mutex::new(None));
    let dispatcher = dispatcher(&root, vec![store_plugin(&seen, &typed), echo_plugin(&seen)]);

    let err = dispatcher.dispatch("store", Vec::new()).expect_err("no config");
    assert!(matches!(
        err,
        DispatchError::Configuration {
            source: ResolveError::NoConfigForPlugin { .. },
            ..
        }
    ));
    assert!(typed.lock().expect("typed").is_none());

    dispatcher.dispatch("echo", vec!["hi".into()]).expect("echo runs");
    assert_eq!(
        seen.lock().expect("seen").as_slice(),
        [(None, vec!["hi".to_owned()])]
    );
}
