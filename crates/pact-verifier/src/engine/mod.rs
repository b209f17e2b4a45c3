//! Capability boundary around the external verification engine.
//!
//! The [`EngineLauncher`] trait models "launch the engine for this
//! configuration and report how it ended". The production implementation is
//! [`SubprocessLauncher`](crate::process::SubprocessLauncher); tests supply
//! scripted launchers so task behaviour can be exercised without spawning
//! real processes.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::VerifierConfig;
use crate::error::VerificationError;

/// How an engine run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    /// The process exited on its own with this code. Signal terminations
    /// report `-1`.
    Code(i32),
    /// The launcher killed the process once its deadline elapsed.
    DeadlineElapsed(Duration),
}

/// Raw result of a single engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRun {
    exit: EngineExit,
    transcript: String,
}

impl EngineRun {
    /// Records a run that exited with `exit_code`.
    #[must_use]
    pub fn exited(exit_code: i32, transcript: impl Into<String>) -> Self {
        Self {
            exit: EngineExit::Code(exit_code),
            transcript: transcript.into(),
        }
    }

    /// Records a run that was killed after `deadline`.
    #[must_use]
    pub fn killed_after(deadline: Duration, transcript: impl Into<String>) -> Self {
        Self {
            exit: EngineExit::DeadlineElapsed(deadline),
            transcript: transcript.into(),
        }
    }

    /// Returns how the run ended.
    #[must_use]
    pub const fn exit(&self) -> EngineExit {
        self.exit
    }

    /// Returns the unfiltered combined output, in arrival order.
    #[must_use]
    pub const fn transcript(&self) -> &str {
        self.transcript.as_str()
    }

    /// Splits the run into its exit and transcript.
    #[must_use]
    pub fn into_parts(self) -> (EngineExit, String) {
        (self.exit, self.transcript)
    }
}

/// Launches the verification engine for a validated configuration.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use pact_verifier::{EngineLauncher, EngineRun, VerificationError, VerifierConfig};
///
/// struct AlwaysPasses;
///
/// #[async_trait]
/// impl EngineLauncher for AlwaysPasses {
///     async fn launch(&self, _config: &VerifierConfig) -> Result<EngineRun, VerificationError> {
///         Ok(EngineRun::exited(0, "1 interaction, 0 failures\n"))
///     }
/// }
/// ```
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Runs the engine to completion and returns its exit and transcript.
    ///
    /// A non-zero exit is a normal [`EngineRun`], not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationError`] when the engine cannot be started or
    /// supervised.
    async fn launch(&self, config: &VerifierConfig) -> Result<EngineRun, VerificationError>;
}
