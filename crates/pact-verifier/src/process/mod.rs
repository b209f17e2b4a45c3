//! Subprocess-based engine execution.
//!
//! [`SubprocessLauncher`] implements [`EngineLauncher`] by translating the
//! validated configuration into an [`EngineCommand`], spawning it with
//! stdout and stderr piped, and accumulating both streams into a single
//! transcript in arrival order. The engine's own `--timeout` governs its
//! operation budget; the launcher only enforces a wall-clock deadline when
//! one is configured with [`SubprocessLauncher::with_kill_after`].

use std::ffi::{OsStr, OsString};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{PactSource, REDACTED, VerifierConfig};
use crate::engine::{EngineLauncher, EngineRun};
use crate::error::VerificationError;

/// Tracing target for engine process operations.
const PROCESS_TARGET: &str = "pact_verifier::process";

/// Executable launched when no engine is configured.
pub const DEFAULT_ENGINE: &str = "pact-provider-verifier";

const BROKER_PASSWORD_FLAG: &str = "--broker-password";

/// How long output is still read once the engine has exited or been killed.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Command line for a single engine run.
///
/// # Example
///
/// ```
/// use pact_verifier::{RawConfig, process::EngineCommand};
///
/// let config = RawConfig {
///     provider_base_url: Some("http://localhost:8080".into()),
///     pact_urls: vec!["http://broker/pacts/a".into(), "http://broker/pacts/b".into()],
///     timeout: Some(5000),
///     ..RawConfig::default()
/// }
/// .validate()
/// .expect("valid");
///
/// let command = EngineCommand::from_config("pact-provider-verifier", &config);
/// assert_eq!(
///     command.args(),
///     &[
///         "--provider-base-url", "http://localhost:8080",
///         "--pact-urls", "http://broker/pacts/a,http://broker/pacts/b",
///         "--timeout", "5000",
///     ],
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    program: OsString,
    args: Vec<String>,
}

impl EngineCommand {
    /// Builds the engine command line from a validated configuration.
    #[must_use]
    pub fn from_config(program: impl Into<OsString>, config: &VerifierConfig) -> Self {
        Self::with_leading_args(program, Vec::new(), config)
    }

    /// Builds the command line with `leading` arguments placed before the
    /// engine flags, for engines started through a wrapper.
    #[must_use]
    pub fn with_leading_args(
        program: impl Into<OsString>,
        leading: Vec<String>,
        config: &VerifierConfig,
    ) -> Self {
        let mut args = leading;
        args.push(String::from("--provider-base-url"));
        args.push(config.provider_base_url().to_owned());

        let locations: Vec<String> = config
            .pact_sources()
            .iter()
            .map(PactSource::to_engine_arg)
            .collect();
        args.push(String::from("--pact-urls"));
        args.push(locations.join(","));

        if let Some(states) = config.provider_states() {
            args.push(String::from("--provider-states-url"));
            args.push(states.url().to_owned());
            args.push(String::from("--provider-states-setup-url"));
            args.push(states.setup_url().to_owned());
        }

        if let Some(credentials) = config.broker_credentials() {
            args.push(String::from("--broker-username"));
            args.push(credentials.username().to_owned());
            args.push(String::from(BROKER_PASSWORD_FLAG));
            args.push(credentials.password().to_owned());
        }

        if let Some(timeout) = config.timeout() {
            args.push(String::from("--timeout"));
            args.push(duration_millis(timeout).to_string());
        }

        Self {
            program: program.into(),
            args,
        }
    }

    /// Returns the executable to launch.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Returns the arguments in order.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the arguments with the broker password masked, for logging.
    #[must_use]
    pub fn redacted_args(&self) -> Vec<&str> {
        let mut masked = Vec::with_capacity(self.args.len());
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                masked.push(REDACTED);
            } else {
                masked.push(arg.as_str());
            }
            mask_next = arg == BROKER_PASSWORD_FLAG;
        }
        masked
    }
}

/// Launches the engine as a child process.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use pact_verifier::process::SubprocessLauncher;
///
/// let launcher = SubprocessLauncher::new("bundle")
///     .with_leading_args(vec!["exec".into(), "pact-provider-verifier".into()])
///     .with_env("PACT_DO_NOT_TRACK", "true")
///     .with_kill_after(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    program: OsString,
    leading_args: Vec<String>,
    env: Vec<(OsString, OsString)>,
    kill_after: Option<Duration>,
}

impl Default for SubprocessLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE)
    }
}

impl SubprocessLauncher {
    /// Creates a launcher for the given engine executable.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            env: Vec::new(),
            kill_after: None,
        }
    }

    /// Sets arguments placed before the engine flags.
    #[must_use]
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// Adds an environment variable for the engine process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Kills the engine if it has not exited after `deadline`.
    #[must_use]
    pub const fn with_kill_after(mut self, deadline: Duration) -> Self {
        self.kill_after = Some(deadline);
        self
    }

    /// Returns the engine executable.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Returns the configured wall-clock deadline, if any.
    #[must_use]
    pub const fn kill_after(&self) -> Option<Duration> {
        self.kill_after
    }

    /// Builds the command this launcher would run for `config`.
    #[must_use]
    pub fn command_for(&self, config: &VerifierConfig) -> EngineCommand {
        EngineCommand::with_leading_args(self.program.clone(), self.leading_args.clone(), config)
    }
}

#[async_trait]
impl EngineLauncher for SubprocessLauncher {
    async fn launch(&self, config: &VerifierConfig) -> Result<EngineRun, VerificationError> {
        let command = self.command_for(config);
        run_engine(&command, &self.env, self.kill_after).await
    }
}

/// How waiting on the child ended.
enum Exit {
    Completed(ExitStatus),
    DeadlineElapsed(Duration),
}

async fn run_engine(
    command: &EngineCommand,
    env: &[(OsString, OsString)],
    kill_after: Option<Duration>,
) -> Result<EngineRun, VerificationError> {
    let engine = command.program().to_string_lossy().into_owned();
    let mut process = Command::new(command.program());
    process
        .args(command.args())
        .envs(env.iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(
        target: PROCESS_TARGET,
        engine = %engine,
        args = ?command.redacted_args(),
        "spawning verification engine"
    );

    let mut child = process.spawn().map_err(|err| VerificationError::Launch {
        engine: engine.clone(),
        message: err.to_string(),
        source: Some(Arc::new(err)),
    })?;

    let stdout = child.stdout.take().ok_or_else(|| VerificationError::Launch {
        engine: engine.clone(),
        message: String::from("failed to capture stdout"),
        source: None,
    })?;
    let stderr = child.stderr.take().ok_or_else(|| VerificationError::Launch {
        engine: engine.clone(),
        message: String::from("failed to capture stderr"),
        source: None,
    })?;

    let (sink, chunks) = mpsc::unbounded_channel();
    let pumps = [
        spawn_pump(stdout, sink.clone()),
        spawn_pump(stderr, sink),
    ];

    let exit = wait_for_exit(&engine, &mut child, kill_after).await?;
    let (transcript, drained) = collect_transcript(chunks, OUTPUT_DRAIN_GRACE).await;
    if !drained {
        warn!(
            target: PROCESS_TARGET,
            engine = %engine,
            grace_ms = duration_millis(OUTPUT_DRAIN_GRACE),
            "engine output still open after exit, a leftover process holds its pipes"
        );
    }
    for pump in pumps {
        if !drained {
            pump.abort();
        }
        report_pump(&engine, pump).await;
    }

    match exit {
        Exit::Completed(status) => {
            let exit_code = status.code().unwrap_or(-1);
            debug!(
                target: PROCESS_TARGET,
                engine = %engine,
                exit_code,
                transcript_bytes = transcript.len(),
                "verification engine exited"
            );
            Ok(EngineRun::exited(exit_code, transcript))
        }
        Exit::DeadlineElapsed(deadline) => Ok(EngineRun::killed_after(deadline, transcript)),
    }
}

/// Forwards every line read from `stream` into `sink`, terminators included.
fn spawn_pump<R>(
    stream: R,
    sink: mpsc::UnboundedSender<String>,
) -> JoinHandle<std::io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                return Ok(());
            }
            if sink.send(String::from_utf8_lossy(&line).into_owned()).is_err() {
                return Ok(());
            }
        }
    })
}

/// Gathers output until both pipes close or `grace` elapses.
///
/// Processes the engine leaves behind inherit its pipes, so end of output is
/// only awaited for a bounded time once the engine itself has gone. Returns
/// the transcript and whether both pipes closed.
async fn collect_transcript(
    mut chunks: mpsc::UnboundedReceiver<String>,
    grace: Duration,
) -> (String, bool) {
    let deadline = Instant::now() + grace;
    let mut transcript = String::new();
    while let Ok(next) = tokio::time::timeout_at(deadline, chunks.recv()).await {
        match next {
            Some(chunk) => transcript.push_str(&chunk),
            None => return (transcript, true),
        }
    }
    while let Ok(chunk) = chunks.try_recv() {
        transcript.push_str(&chunk);
    }
    (transcript, false)
}

async fn report_pump(engine: &str, pump: JoinHandle<std::io::Result<()>>) {
    match pump.await {
        Ok(Ok(())) => {}
        Err(err) if err.is_cancelled() => {}
        Ok(Err(err)) => warn!(
            target: PROCESS_TARGET,
            engine,
            error = %err,
            "failed to read engine output"
        ),
        Err(err) => warn!(
            target: PROCESS_TARGET,
            engine,
            error = %err,
            "engine output reader stopped unexpectedly"
        ),
    }
}

/// Waits for the child to exit, killing it once `kill_after` elapses.
async fn wait_for_exit(
    engine: &str,
    child: &mut Child,
    kill_after: Option<Duration>,
) -> Result<Exit, VerificationError> {
    let io_error = |err: std::io::Error| VerificationError::Io {
        engine: engine.to_owned(),
        source: Arc::new(err),
    };

    let Some(deadline) = kill_after else {
        return child.wait().await.map(Exit::Completed).map_err(io_error);
    };

    if let Ok(status) = tokio::time::timeout(deadline, child.wait()).await {
        return status.map(Exit::Completed).map_err(io_error);
    }

    warn!(
        target: PROCESS_TARGET,
        engine,
        deadline_ms = duration_millis(deadline),
        "verification engine exceeded its deadline, killing process"
    );
    child.kill().await.map_err(io_error)?;
    Ok(Exit::DeadlineElapsed(deadline))
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
