//! Rendering of verification results.

use std::io::Write;

use pact_verifier::{VerificationError, VerificationOutcome};

use crate::cli::OutputFormat;
use crate::errors::AppError;

/// Writes the result of a run to `stdout` in the requested format.
///
/// Human output is the filtered transcript followed by a summary line on
/// success; failures print only the transcript, and the caller reports the
/// error on stderr. JSON output is a single `{success, exitCode, output}`
/// object either way.
pub(crate) fn render<W>(
    format: OutputFormat,
    result: &Result<VerificationOutcome, VerificationError>,
    stdout: &mut W,
) -> Result<(), AppError>
where
    W: Write,
{
    match format {
        OutputFormat::Human => render_human(result, stdout),
        OutputFormat::Json => render_json(result, stdout),
    }
}

fn render_human<W: Write>(
    result: &Result<VerificationOutcome, VerificationError>,
    stdout: &mut W,
) -> Result<(), AppError> {
    let transcript = match result {
        Ok(outcome) => outcome.output(),
        Err(error) => error.output(),
    };
    write_transcript(transcript, stdout).map_err(AppError::WriteOutput)?;
    if result.is_ok() {
        writeln!(stdout, "verification passed").map_err(AppError::WriteOutput)?;
    }
    stdout.flush().map_err(AppError::WriteOutput)
}

fn write_transcript<W: Write>(transcript: &str, stdout: &mut W) -> std::io::Result<()> {
    if transcript.is_empty() {
        return Ok(());
    }
    stdout.write_all(transcript.as_bytes())?;
    if transcript.ends_with('\n') {
        Ok(())
    } else {
        stdout.write_all(b"\n")
    }
}

fn render_json<W: Write>(
    result: &Result<VerificationOutcome, VerificationError>,
    stdout: &mut W,
) -> Result<(), AppError> {
    let rejected;
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(error) => {
            rejected = VerificationOutcome::from_error(error);
            &rejected
        }
    };
    serde_json::to_writer(&mut *stdout, outcome).map_err(AppError::SerialiseOutcome)?;
    stdout.write_all(b"\n").map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}
