//! Command-line runtime for the provider contract verifier.
//!
//! The runtime parses arguments, layers them over an optional JSON
//! configuration file, installs telemetry, and drives a single
//! [`VerificationTask`] to completion. IO streams are injected so the whole
//! flow can be exercised from tests with a scripted engine launcher.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use pact_verifier::{EngineLauncher, SubprocessLauncher, VerificationTask};
use tracing::debug;

mod cli;
mod config;
mod errors;
mod logging;
mod output;
mod telemetry;


use cli::Cli;
pub use cli::OutputFormat;
use errors::AppError;
pub use logging::LogFormat;

/// Tracing target for CLI runtime events.
const CLI_TARGET: &str = "pact_verifier_cli";

struct CliRunner<'a, W: Write, E: Write> {
    stdout: &'a mut W,
    stderr: &'a mut E,
}

impl<'a, W, E> CliRunner<'a, W, E>
where
    W: Write,
    E: Write,
{
    const fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }

    fn run<I, L, F>(&mut self, args: I, launcher_for: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        L: EngineLauncher + 'static,
        F: FnOnce(&Cli) -> L,
    {
        match self.execute(args, launcher_for) {
            Ok(()) => ExitCode::SUCCESS,
            Err(AppError::CliUsage(error)) if !error.use_stderr() => {
                let _ = write!(self.stdout, "{error}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                let _ = writeln!(self.stderr, "{error}");
                error.exit_code()
            }
        }
    }

    fn execute<I, L, F>(&mut self, args: I, launcher_for: F) -> Result<(), AppError>
    where
        I: IntoIterator<Item = OsString>,
        L: EngineLauncher + 'static,
        F: FnOnce(&Cli) -> L,
    {
        let cli = Cli::try_parse_from(args).map_err(AppError::CliUsage)?;
        telemetry::initialise(&cli.log_filter, cli.log_format)?;

        let raw = config::merge(config::load(cli.config.as_deref())?, &cli);
        debug!(target: CLI_TARGET, config = ?raw, "resolved verification configuration");

        let task = VerificationTask::new(&raw, launcher_for(&cli))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AppError::Runtime)?;
        let result = runtime.block_on(async { task.verify().await });

        output::render(cli.output, &result, self.stdout)?;
        result.map(|_| ()).map_err(AppError::from)
    }
}

/// Builds the subprocess launcher described by the engine flags.
fn launcher_from_cli(cli: &Cli) -> SubprocessLauncher {
    let launcher = cli.engine_env.iter().fold(
        SubprocessLauncher::new(cli.engine.clone()).with_leading_args(cli.engine_args.clone()),
        |launcher, (key, value)| launcher.with_env(key, value),
    );
    match cli.kill_after {
        Some(millis) => launcher.with_kill_after(Duration::from_millis(millis)),
        None => launcher,
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Returns `0` when verification passes, `2` for usage and configuration
/// errors, the engine's exit code when verification fails, and `1` for any
/// other failure.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    CliRunner::new(stdout, stderr).run(args, launcher_from_cli)
}
