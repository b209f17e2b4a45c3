//! Verification tasks and their pending results.
//!
//! A [`VerificationTask`] pairs a validated configuration with an
//! [`EngineLauncher`]. Constructing one never starts a process. Calling
//! [`VerificationTask::verify`] consumes the task, dispatches exactly one
//! engine run on the ambient Tokio runtime, and returns a
//! [`PendingVerification`] immediately. Awaiting it yields the outcome:
//! exit code `0` resolves to a [`VerificationOutcome`], anything else
//! rejects with a [`VerificationError`] carrying the filtered transcript.
//!
//! Run-time failures, including the absence of a runtime to dispatch on,
//! are only ever delivered through the pending result.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{RawConfig, VerifierConfig, validate};
use crate::engine::{EngineExit, EngineLauncher, EngineRun};
use crate::error::{ConfigurationError, VerificationError};
use crate::filter::OutputFilter;
use crate::process::duration_millis;

/// Tracing target for verification task lifecycle events.
const TASK_TARGET: &str = "pact_verifier::task";

/// Lifecycle of a verification task.
///
/// # Example
///
/// ```
/// use pact_verifier::TaskState;
///
/// assert_eq!(TaskState::Running.as_str(), "running");
/// assert!(TaskState::Failed.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Validated, no process launched yet.
    Created,
    /// The engine has been dispatched.
    Running,
    /// The engine exited with code `0`.
    Succeeded,
    /// The run was rejected.
    Failed,
}

impl TaskState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` once the run has settled.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a verification run, as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    success: bool,
    exit_code: i32,
    output: String,
}

impl VerificationOutcome {
    /// Outcome of a run whose engine exited with code `0`.
    #[must_use]
    pub const fn passed(output: String) -> Self {
        Self {
            success: true,
            exit_code: 0,
            output,
        }
    }

    /// Outcome describing a rejected run, for uniform reporting.
    ///
    /// Runs that never produced an exit code report `-1`.
    #[must_use]
    pub fn from_error(error: &VerificationError) -> Self {
        Self {
            success: false,
            exit_code: error.exit_code().unwrap_or(-1),
            output: error.output().to_owned(),
        }
    }

    /// Returns `true` when the engine reported success.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Returns the engine exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns the filtered transcript.
    #[must_use]
    pub const fn output(&self) -> &str {
        self.output.as_str()
    }
}

/// A single, not yet dispatched, verification run.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use pact_verifier::{
///     EngineLauncher, EngineRun, RawConfig, TaskState, VerificationError, VerificationTask,
///     VerifierConfig,
/// };
///
/// struct Passing;
///
/// #[async_trait]
/// impl EngineLauncher for Passing {
///     async fn launch(&self, _config: &VerifierConfig) -> Result<EngineRun, VerificationError> {
///         Ok(EngineRun::exited(0, "1 interaction, 0 failures\n"))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let raw = RawConfig {
///     provider_base_url: Some("http://localhost".into()),
///     pact_urls: vec!["http://idontexist".into()],
///     ..RawConfig::default()
/// };
/// let task = VerificationTask::new(&raw, Passing).expect("valid configuration");
/// assert_eq!(task.state(), TaskState::Created);
///
/// let outcome = task.verify().await.expect("engine passed");
/// assert!(outcome.success());
/// assert_eq!(outcome.output(), "1 interaction, 0 failures\n");
/// # }
/// ```
pub struct VerificationTask<L> {
    config: VerifierConfig,
    launcher: L,
    filter: OutputFilter,
}

impl<L> fmt::Debug for VerificationTask<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationTask")
            .field("config", &self.config)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<L> VerificationTask<L> {
    /// Validates `raw` and creates a task that will run on `launcher`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found by
    /// [`validate`](crate::validate); no process is started.
    pub fn new(raw: &RawConfig, launcher: L) -> Result<Self, ConfigurationError> {
        validate(raw).map(|config| Self::from_config(config, launcher))
    }

    /// Creates a task from an already validated configuration.
    #[must_use]
    pub fn from_config(config: VerifierConfig, launcher: L) -> Self {
        Self {
            config,
            launcher,
            filter: OutputFilter::default(),
        }
    }

    /// Replaces the transcript filter.
    #[must_use]
    pub fn with_filter(mut self, filter: OutputFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the validated configuration.
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Returns the task state. Undispatched tasks are always
    /// [`TaskState::Created`].
    #[must_use]
    pub const fn state(&self) -> TaskState {
        TaskState::Created
    }
}

impl<L> VerificationTask<L>
where
    L: EngineLauncher + 'static,
{
    /// Dispatches the engine and returns the pending result immediately.
    ///
    /// Consuming the task guarantees at most one engine process per task.
    /// Must be called from within a Tokio runtime; otherwise the pending
    /// result rejects with [`VerificationError::Aborted`].
    #[must_use = "the verification runs in the background; await the pending result"]
    pub fn verify(self) -> PendingVerification {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                target: TASK_TARGET,
                "no Tokio runtime available, rejecting verification run"
            );
            return PendingVerification::rejected(VerificationError::Aborted {
                message: String::from("no async runtime available to launch the engine"),
            });
        };

        info!(
            target: TASK_TARGET,
            provider = self.config.provider_base_url(),
            pacts = self.config.pact_sources().len(),
            "dispatching verification run"
        );

        let (state, observer) = watch::channel(TaskState::Running);
        let handle = runtime.spawn(self.run(state));
        PendingVerification {
            inner: Pending::Spawned(handle),
            state: observer,
        }
    }

    async fn run(
        self,
        state: watch::Sender<TaskState>,
    ) -> Result<VerificationOutcome, VerificationError> {
        let result = self
            .launcher
            .launch(&self.config)
            .await
            .and_then(|run| settle(run, &self.filter));

        match &result {
            Ok(_) => info!(target: TASK_TARGET, "verification passed"),
            Err(error) => warn!(target: TASK_TARGET, %error, "verification failed"),
        }
        state.send_replace(if result.is_ok() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        });
        result
    }
}

/// Maps a finished engine run onto the caller-visible result.
fn settle(run: EngineRun, filter: &OutputFilter) -> Result<VerificationOutcome, VerificationError> {
    let (exit, transcript) = run.into_parts();
    let output = filter.filter(&transcript);
    match exit {
        EngineExit::Code(0) => Ok(VerificationOutcome::passed(output)),
        EngineExit::Code(exit_code) => Err(VerificationError::Failed { exit_code, output }),
        EngineExit::DeadlineElapsed(deadline) => Err(VerificationError::TimedOut {
            timeout_ms: duration_millis(deadline),
            output,
        }),
    }
}

enum Pending {
    Spawned(JoinHandle<Result<VerificationOutcome, VerificationError>>),
    Rejected(VerificationError),
}

/// Deferred result of a dispatched verification run.
///
/// Await it directly, or call [`PendingVerification::outcome`]. The current
/// lifecycle state can be observed while the engine runs.
pub struct PendingVerification {
    inner: Pending,
    state: watch::Receiver<TaskState>,
}

impl fmt::Debug for PendingVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingVerification")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PendingVerification {
    fn rejected(error: VerificationError) -> Self {
        let (_, observer) = watch::channel(TaskState::Failed);
        Self {
            inner: Pending::Rejected(error),
            state: observer,
        }
    }

    /// Returns the current lifecycle state of the run.
    ///
    /// A run that ended without settling, such as a panicking launcher,
    /// reports [`TaskState::Failed`].
    #[must_use]
    pub fn state(&self) -> TaskState {
        // Checked before reading so a final send is always observed.
        let closed = self.state.has_changed().is_err();
        let current = *self.state.borrow();
        if closed && !current.is_terminal() {
            TaskState::Failed
        } else {
            current
        }
    }

    /// Waits for the engine to exit and returns the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Failed`] for a non-zero exit, or the
    /// launch, supervision, or deadline failure that ended the run.
    pub async fn outcome(self) -> Result<VerificationOutcome, VerificationError> {
        match self.inner {
            Pending::Rejected(error) => Err(error),
            Pending::Spawned(handle) => handle.await.unwrap_or_else(|err| {
                Err(VerificationError::Aborted {
                    message: err.to_string(),
                })
            }),
        }
    }
}

impl IntoFuture for PendingVerification {
    type Output = Result<VerificationOutcome, VerificationError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.outcome())
    }
}

#[cfg(test)]
mod tests;
