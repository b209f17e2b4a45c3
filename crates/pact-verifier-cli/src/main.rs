//! CLI entrypoint for the provider contract verifier.
//!
//! The binary delegates to [`pact_verifier_cli::run`], which parses
//! arguments, merges any configuration file, runs the verification engine,
//! and maps the outcome onto the process exit code.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: the tracing subscriber writes to stderr concurrently.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    pact_verifier_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
