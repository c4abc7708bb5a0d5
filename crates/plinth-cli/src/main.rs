//! CLI entrypoint for the plinth plugin host.
//!
//! The binary delegates to [`plinth_cli::run`], which parses arguments,
//! initialises telemetry, and dispatches lifecycle commands against the
//! configured plugin root.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    plinth_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
