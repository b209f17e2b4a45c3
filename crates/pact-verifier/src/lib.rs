//! Provider-side contract verification orchestration.
//!
//! The `pact-verifier` crate checks a provider against one or more consumer
//! contracts by driving an external verification engine. Callers describe a
//! run with a [`RawConfig`]; [`validate`] turns it into an immutable
//! [`VerifierConfig`] or reports the first [`ConfigurationError`]. A
//! [`VerificationTask`] then launches the engine through an
//! [`EngineLauncher`] and hands back a [`PendingVerification`] that settles
//! once the engine exits.
//!
//! Engine output is captured in full and passed through an
//! [`OutputFilter`], which strips comment lines and launcher echoes and
//! collapses blank lines, before it reaches the caller.
//!
//! # Architecture
//!
//! The engine boundary is the [`EngineLauncher`] trait. Production code uses
//! [`SubprocessLauncher`], which spawns the engine executable with the
//! configuration rendered as command-line flags. Tests substitute scripted
//! launchers so the task lifecycle can be exercised without real processes.
//!
//! # Example
//!
//! ```rust,no_run
//! use pact_verifier::{RawConfig, verifier};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = RawConfig {
//!     provider_base_url: Some("http://localhost:8080".into()),
//!     pact_urls: vec!["pacts/web-api.json".into()],
//!     ..RawConfig::default()
//! };
//!
//! let outcome = verifier(&raw)?.verify().await?;
//! println!("{}", outcome.output());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod process;
pub mod task;

#[cfg(test)]
mod tests;

pub use self::config::{
    BrokerCredentials, PactSource, ProviderStates, RawConfig, VerifierConfig, validate,
};
pub use self::engine::{EngineExit, EngineLauncher, EngineRun};
pub use self::error::{ConfigurationError, VerificationError};
pub use self::filter::{OutputFilter, filter_transcript};
pub use self::process::SubprocessLauncher;
pub use self::task::{PendingVerification, TaskState, VerificationOutcome, VerificationTask};

/// Creates a verification task that runs the default engine executable.
///
/// # Errors
///
/// Returns the first [`ConfigurationError`] found in `raw`.
pub fn verifier(
    raw: &RawConfig,
) -> Result<VerificationTask<SubprocessLauncher>, ConfigurationError> {
    VerificationTask::new(raw, SubprocessLauncher::default())
}
