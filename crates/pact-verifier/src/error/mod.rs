//! Domain errors raised while validating and running a verification.
//!
//! Configuration problems surface synchronously as [`ConfigurationError`]
//! before any process starts. Everything that goes wrong once the engine has
//! been dispatched is a [`VerificationError`] delivered through the pending
//! result. I/O errors are wrapped in `Arc` to satisfy the `result_large_err`
//! Clippy lint and keep both enums `Clone`.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Caller-fixable problems detected while validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The provider base URL is absent or not an absolute URL.
    #[error("missing or invalid provider base URL")]
    InvalidProviderBaseUrl {
        /// Value that was supplied, if any.
        value: Option<String>,
    },

    /// No contract locations were supplied.
    #[error("no pact URLs provided")]
    NoPactUrls,

    /// Only one of the provider-state URLs was supplied.
    #[error("provider states URL and setup URL must be supplied together")]
    UnpairedProviderStates,

    /// The timeout is negative.
    #[error("invalid timeout")]
    InvalidTimeout {
        /// Timeout that was supplied, in milliseconds.
        value: i64,
    },

    /// A local contract location does not exist on the filesystem.
    #[error("pact file not found: {}", .path.display())]
    PactFileNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// A provider-state URL is not an absolute URL.
    #[error("invalid provider states URL: {value}")]
    InvalidProviderStatesUrl {
        /// Value that failed to parse.
        value: String,
    },

    /// Only one of the broker credentials was supplied.
    #[error("pact broker username and password must be supplied together")]
    UnpairedBrokerCredentials,
}

/// Failures reported once a verification run has been dispatched.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    /// The engine exited with a non-zero status.
    #[error("verification failed with exit code {exit_code}")]
    Failed {
        /// Engine exit code.
        exit_code: i32,
        /// Filtered engine transcript.
        output: String,
    },

    /// The engine process could not be started.
    #[error("failed to launch verification engine '{engine}': {message}")]
    Launch {
        /// Engine program that was invoked.
        engine: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// An I/O error occurred while supervising the engine process.
    #[error("I/O error while running verification engine '{engine}': {source}")]
    Io {
        /// Engine program that was invoked.
        engine: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The engine outlived the launcher's kill-after deadline.
    #[error("verification engine was killed after exceeding {timeout_ms}ms")]
    TimedOut {
        /// Deadline that elapsed, in milliseconds.
        timeout_ms: u64,
        /// Filtered transcript captured before the engine was killed.
        output: String,
    },

    /// The run ended without producing a result.
    #[error("verification run aborted: {message}")]
    Aborted {
        /// Description of why the run was abandoned.
        message: String,
    },
}

impl VerificationError {
    /// Returns the engine exit code when the engine ran to completion.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Returns the filtered transcript captured before the failure.
    ///
    /// Launch and supervision failures carry no transcript and return an
    /// empty string.
    #[must_use]
    pub fn output(&self) -> &str {
        match self {
            Self::Failed { output, .. } | Self::TimedOut { output, .. } => output.as_str(),
            Self::Launch { .. } | Self::Io { .. } | Self::Aborted { .. } => "",
        }
    }
}
