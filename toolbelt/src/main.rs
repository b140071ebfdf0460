//! `toolbelt` command-line entry point.

mod builtin;

use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches, Parser};
use toolbelt::config::{DEFAULT_CONFIG_NAME, load_or_report};
use toolbelt::plugins::{Dispatcher, InstalledPlugins, PluginRegistry};
use toolbelt::providers::StorageFactory;

#[derive(Debug, Parser)]
#[command(name = "toolbelt", version)]
#[command(about = "Operations toolbelt: runs plugins with their configuration", long_about = None)]
struct Cli {
    /// Root configuration document
    #[arg(short = 'c', long = "config-file", value_name = "FILE", default_value = DEFAULT_CONFIG_NAME)]
    config_file: String,

    /// Plugin to run
    #[arg(value_name = "PLUGIN")]
    command: Option<String>,

    /// Arguments passed through to the plugin
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn plugin_listing(registry: &PluginRegistry) -> String {
    registry
        .iter()
        .map(|plugin| {
            let manifest = plugin.manifest();
            format!(
                "\n  {:<16} {}",
                manifest.name().as_str(),
                manifest.summary().unwrap_or_default()
            )
        })
        .fold(String::from("Plugins:"), |listing, line| listing + &line)
}

fn main() -> ExitCode {
    let registry = match PluginRegistry::discover(&InstalledPlugins) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut command = Cli::command().after_help(plugin_listing(&registry));
    let cli = match Cli::from_arg_matches(&command.get_matches_mut()) {
        Ok(cli) => cli,
        Err(err) => err.format(&mut command).exit(),
    };

    if cli.config_file.trim().is_empty() {
        eprintln!("error: no config file given");
        return ExitCode::FAILURE;
    }
    let Some(config) = load_or_report(&cli.config_file) else {
        return ExitCode::FAILURE;
    };

    let Some(name) = cli.command else {
        return match command.print_help() {
            Ok(()) => ExitCode::from(2),
            Err(err) => {
                eprintln!("error: writing help: {err}");
                ExitCode::FAILURE
            }
        };
    };

    let dispatcher = Dispatcher::new(registry, Some(config), StorageFactory::builtin());
    match dispatcher.dispatch(&name, cli.args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err.report());
            ExitCode::from(err.exit_code())
        }
    }
}

/// Prints a failure once: a single line gets an `error:` prefix, a block
/// with a header is printed as is.
fn report(lines: &[String]) {
    match lines {
        [line] => eprintln!("error: {line}"),
        block => {
            for line in block {
                eprintln!("{line}");
            }
        }
    }
}
