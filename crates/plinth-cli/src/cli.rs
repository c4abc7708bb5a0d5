//! CLI argument definitions for the plinth plugin host.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use plinth_config::LogFormat;

/// Command-line interface for managing and running plugins.
#[derive(Parser, Debug)]
#[command(name = "plinth", version, about = "Plugin lifecycle and execution host")]
pub(crate) struct Cli {
    /// Directory holding installed plugin packages.
    #[arg(long, value_name = "DIR", global = true)]
    pub(crate) plugin_root: Option<PathBuf>,
    /// Path of the plugin registry snapshot file.
    #[arg(long, value_name = "FILE", global = true)]
    pub(crate) registry: Option<PathBuf>,
    /// Tracing filter expression, e.g. `info` or `plinth_engine=debug`.
    #[arg(long, value_name = "FILTER", global = true)]
    pub(crate) log_filter: Option<String>,
    /// Log output format: `json`, `compact`, or `pretty`.
    #[arg(long, value_name = "FORMAT", global = true)]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Lifecycle and execution subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Installs a plugin from a zip package file.
    Install {
        /// Path of the package archive to install.
        #[arg(value_name = "PACKAGE")]
        package: PathBuf,
    },
    /// Lists installed plugins, newest first.
    List,
    /// Prints the stored metadata of an installed plugin.
    Info {
        /// Plugin identifier.
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Enables a plugin.
    Enable {
        /// Plugin identifier.
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Disables a plugin without removing it.
    Disable {
        /// Plugin identifier.
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Deletes a plugin's package and registry record.
    Remove {
        /// Plugin identifier.
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Runs a plugin and prints its result envelope.
    Run {
        /// Plugin identifier.
        #[arg(value_name = "ID")]
        id: String,
        /// Input mapping as an inline JSON object.
        #[arg(long, value_name = "JSON")]
        input: Option<String>,
        /// File holding the input mapping as a JSON object; `-` reads stdin.
        #[arg(long, value_name = "FILE", conflicts_with = "input")]
        input_file: Option<PathBuf>,
    },
}
