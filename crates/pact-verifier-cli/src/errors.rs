//! Error types and exit-code mapping for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use pact_verifier::{ConfigurationError, VerificationError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Exit status for configuration and usage errors.
const USAGE_EXIT: u8 = 2;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to read configuration file {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        source: Arc<io::Error>,
    },
    #[error("failed to parse configuration file {}: {source}", .path.display())]
    ParseConfig {
        path: PathBuf,
        source: Arc<serde_json::Error>,
    },
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to start the async runtime: {0}")]
    Runtime(io::Error),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("failed to write verification result: {0}")]
    WriteOutput(io::Error),
    #[error("failed to serialise verification result: {0}")]
    SerialiseOutcome(serde_json::Error),
}

impl AppError {
    /// Maps the error onto the process exit status.
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::CliUsage(_)
            | Self::ReadConfig { .. }
            | Self::ParseConfig { .. }
            | Self::Configuration(_) => ExitCode::from(USAGE_EXIT),
            Self::Verification(error) => error
                .exit_code()
                .map_or(ExitCode::FAILURE, engine_exit_code),
            Self::Telemetry(_)
            | Self::Runtime(_)
            | Self::WriteOutput(_)
            | Self::SerialiseOutcome(_) => ExitCode::FAILURE,
        }
    }
}

/// Clamps an engine exit code into the non-zero range a process can report.
pub(crate) fn engine_exit_code(code: i32) -> ExitCode {
    u8::try_from(code.clamp(1, 255)).map_or(ExitCode::FAILURE, ExitCode::from)
}
