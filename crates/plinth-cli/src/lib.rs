//! Command-line runtime for the plinth plugin host.
//!
//! The module owns argument parsing, configuration assembly, telemetry
//! bootstrap, and command dispatch. Commands print JSON to stdout so output
//! can be piped into other tools; diagnostics go to stderr via tracing.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use serde_json::{Map, Value};

use plinth_config::Config;
use plinth_engine::PluginHost;

mod cli;
pub mod telemetry;

use cli::{Cli, Command};

/// Parses arguments, runs one command, and reports its exit code.
///
/// Never panics and never writes outside the two provided streams; parse
/// failures render clap's usage message, command failures render a one-line
/// error. A `run` command whose envelope reports a failure exits non-zero
/// even though the envelope itself prints normally.
pub fn run<I>(args: I, out: &mut impl Write, err: &mut impl Write) -> ExitCode
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let rendered = error.render();
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                writeln!(out, "{rendered}").ok();
                return ExitCode::SUCCESS;
            }
            writeln!(err, "{rendered}").ok();
            return ExitCode::from(2);
        }
    };

    match dispatch(cli, out) {
        Ok(code) => code,
        Err(error) => {
            writeln!(err, "plinth: {error:#}").ok();
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(root) = &cli.plugin_root {
        config = config.with_plugin_root(root.clone());
    }
    if let Some(path) = &cli.registry {
        config = config.with_registry_path(path.clone());
    }
    if let Some(filter) = &cli.log_filter {
        config = config.with_log_filter(filter.clone());
    }
    if let Some(format) = cli.log_format {
        config = config.with_log_format(format);
    }
    config
}

fn dispatch(cli: Cli, out: &mut impl Write) -> anyhow::Result<ExitCode> {
    let config = build_config(&cli);
    telemetry::initialise(&config)?;
    let host = PluginHost::open(&config).context("failed to open plugin host")?;

    match cli.command {
        Command::Install { package } => {
            let archive = std::fs::read(&package)
                .with_context(|| format!("failed to read package '{}'", package.display()))?;
            let record = host.install_package(&archive)?;
            print_json(out, &record)?;
        }
        Command::List => {
            let summaries = host.list_plugins()?;
            print_json(out, &summaries)?;
        }
        Command::Info { id } => {
            let metadata = host.metadata(&id)?;
            print_json(out, &metadata)?;
        }
        Command::Enable { id } => {
            let enabled = host.set_enabled(&id, true)?;
            print_json(out, &toggle_report(&id, enabled))?;
        }
        Command::Disable { id } => {
            let enabled = host.set_enabled(&id, false)?;
            print_json(out, &toggle_report(&id, enabled))?;
        }
        Command::Remove { id } => {
            let record = host.delete_plugin(&id)?;
            print_json(out, &record)?;
        }
        Command::Run {
            id,
            input,
            input_file,
        } => {
            let input = read_input(input.as_deref(), input_file.as_deref())?;
            let envelope = host.run_plugin(&id, &input);
            print_json(out, &envelope)?;
            if envelope.is_error() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn toggle_report(id: &str, enabled: bool) -> Value {
    serde_json::json!({"id": id, "enabled": enabled})
}

/// Resolves the run input mapping from the inline, file, or stdin source.
///
/// An input file of `-` reads standard input. Absent input means an empty
/// mapping; anything present must parse as a JSON object.
fn read_input(
    inline: Option<&str>,
    file: Option<&std::path::Path>,
) -> anyhow::Result<Map<String, Value>> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_owned(),
        (None, Some(path)) if path == std::path::Path::new("-") => {
            std::io::read_to_string(std::io::stdin()).context("failed to read input from stdin")?
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file '{}'", path.display()))?,
        (None, None) => return Ok(Map::new()),
    };
    let value: Value = serde_json::from_str(&text).context("input is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("input must be a JSON object"),
    }
}

fn print_json(out: &mut impl Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    writeln!(out, "{rendered}").context("failed to write output")?;
    Ok(())
}

#[cfg(test)]
mod tests;
