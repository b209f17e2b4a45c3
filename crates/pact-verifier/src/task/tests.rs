//! Unit tests for verification task dispatch and settlement.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use rstest::{fixture, rstest};
use tokio::sync::Notify;

use super::*;

mock! {
    Launcher {}
    #[async_trait]
    impl EngineLauncher for Launcher {
        async fn launch(&self, config: &VerifierConfig) -> Result<EngineRun, VerificationError>;
    }
}

/// Launcher that blocks until released, so the running state is observable.
struct GatedLauncher {
    gate: Arc<Notify>,
    launches: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineLauncher for GatedLauncher {
    async fn launch(&self, _config: &VerifierConfig) -> Result<EngineRun, VerificationError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(EngineRun::exited(0, "released\n"))
    }
}

/// Launcher whose adapter crashes mid-run.
struct PanickingLauncher;

#[async_trait]
impl EngineLauncher for PanickingLauncher {
    async fn launch(&self, _config: &VerifierConfig) -> Result<EngineRun, VerificationError> {
        panic!("engine adapter crashed");
    }
}

#[fixture]
fn raw() -> RawConfig {
    RawConfig {
        provider_base_url: Some("http://localhost".into()),
        pact_urls: vec!["http://idontexist".into()],
        ..RawConfig::default()
    }
}

fn launcher_returning(run: Result<EngineRun, VerificationError>) -> MockLauncher {
    let mut launcher = MockLauncher::new();
    launcher
        .expect_launch()
        .times(1)
        .returning(move |_| run.clone());
    launcher
}

#[rstest]
fn construction_validates_without_launching(raw: RawConfig) {
    let mut launcher = MockLauncher::new();
    launcher.expect_launch().never();

    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");
    assert_eq!(task.state(), TaskState::Created);
    assert_eq!(task.config().provider_base_url(), "http://localhost");
}

#[rstest]
fn debug_output_does_not_require_a_debuggable_launcher(raw: RawConfig) {
    let mut launcher = MockLauncher::new();
    launcher.expect_launch().never();

    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");
    let rendered = format!("{task:?}");
    assert!(rendered.starts_with("VerificationTask"), "got: {rendered}");
    assert!(rendered.contains("http://localhost"), "got: {rendered}");
}

#[rstest]
fn invalid_configuration_is_rejected_synchronously(mut raw: RawConfig) {
    raw.timeout = Some(-10);
    let mut launcher = MockLauncher::new();
    launcher.expect_launch().never();

    let err = VerificationTask::new(&raw, launcher).expect_err("negative timeout");
    assert_eq!(err, ConfigurationError::InvalidTimeout { value: -10 });
}

#[rstest]
#[tokio::test]
async fn zero_exit_resolves_with_filtered_output(raw: RawConfig) {
    let launcher = launcher_returning(Ok(EngineRun::exited(
        0,
        "1 interaction, 0 failures\n\n\n# rerun hint\n",
    )));
    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");

    let outcome = task.verify().await.expect("verification passes");
    assert!(outcome.success());
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.output(), "1 interaction, 0 failures\n");
}

#[rstest]
#[tokio::test]
async fn non_zero_exit_rejects_with_code_and_output(raw: RawConfig) {
    let launcher = launcher_returning(Ok(EngineRun::exited(
        1,
        "1 interaction, 1 failure\nbundle exec rake pact:verify:at[pacts/a.json]\n",
    )));
    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");

    let err = task.verify().await.expect_err("verification fails");
    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(err.output(), "1 interaction, 1 failure\n");
}

#[rstest]
#[tokio::test]
async fn launch_failure_is_delivered_through_the_pending_result(raw: RawConfig) {
    let launcher = launcher_returning(Err(VerificationError::Launch {
        engine: String::from("pact-provider-verifier"),
        message: String::from("No such file or directory"),
        source: None,
    }));
    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");

    let err = task.verify().outcome().await.expect_err("launch fails");
    assert!(matches!(err, VerificationError::Launch { .. }), "got: {err}");
    assert_eq!(err.exit_code(), None);
}

#[rstest]
#[tokio::test]
async fn elapsed_deadline_rejects_as_timed_out(raw: RawConfig) {
    let launcher = launcher_returning(Ok(EngineRun::killed_after(
        Duration::from_millis(1500),
        "Verifying a pact\n",
    )));
    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");

    let err = task.verify().await.expect_err("deadline elapsed");
    assert!(
        matches!(err, VerificationError::TimedOut { timeout_ms: 1500, .. }),
        "got: {err}"
    );
    assert_eq!(err.output(), "Verifying a pact\n");
}

#[rstest]
#[tokio::test]
async fn custom_filter_applies_to_output(raw: RawConfig) {
    let launcher = launcher_returning(Ok(EngineRun::exited(
        0,
        "kept\npact-provider-verifier --pact-urls a.json\n",
    )));
    let task = VerificationTask::new(&raw, launcher)
        .expect("valid configuration")
        .with_filter(OutputFilter::new().with_echo_marker("pact-provider-verifier --pact-urls"));

    let outcome = task.verify().await.expect("verification passes");
    assert_eq!(outcome.output(), "kept\n");
}

#[rstest]
#[tokio::test]
async fn pending_result_reports_running_until_the_engine_exits(raw: RawConfig) {
    let gate = Arc::new(Notify::new());
    let launches = Arc::new(AtomicUsize::new(0));
    let launcher = GatedLauncher {
        gate: Arc::clone(&gate),
        launches: Arc::clone(&launches),
    };
    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");

    let pending = task.verify();
    assert_eq!(pending.state(), TaskState::Running);

    gate.notify_one();
    let outcome = pending.await.expect("verification passes");
    assert_eq!(outcome.output(), "released\n");
    assert_eq!(launches.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn panicking_launcher_leaves_the_run_failed(raw: RawConfig) {
    let task = VerificationTask::new(&raw, PanickingLauncher).expect("valid configuration");
    let pending = task.verify();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !pending.state().is_terminal() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("run settles");
    assert_eq!(pending.state(), TaskState::Failed);

    let err = pending.await.expect_err("launcher panicked");
    assert!(matches!(err, VerificationError::Aborted { .. }), "got: {err}");
}

#[rstest]
fn verify_without_runtime_rejects_instead_of_panicking(raw: RawConfig) {
    let mut launcher = MockLauncher::new();
    launcher.expect_launch().never();
    let task = VerificationTask::new(&raw, launcher).expect("valid configuration");

    let pending = task.verify();
    assert_eq!(pending.state(), TaskState::Failed);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime builds");
    let err = runtime
        .block_on(pending.outcome())
        .expect_err("no runtime was available at dispatch");
    assert!(matches!(err, VerificationError::Aborted { .. }), "got: {err}");
}

#[rstest]
#[case(TaskState::Created, "created", false)]
#[case(TaskState::Running, "running", false)]
#[case(TaskState::Succeeded, "succeeded", true)]
#[case(TaskState::Failed, "failed", true)]
fn task_state_names(#[case] state: TaskState, #[case] name: &str, #[case] terminal: bool) {
    assert_eq!(state.to_string(), name);
    assert_eq!(state.is_terminal(), terminal);
    assert_eq!(
        serde_json::to_string(&state).expect("serialises"),
        format!("\"{name}\"")
    );
}

#[test]
fn outcome_serialises_in_camel_case() {
    let outcome = VerificationOutcome::passed(String::from("ok\n"));
    let json = serde_json::to_value(&outcome).expect("serialises");
    assert_eq!(
        json,
        serde_json::json!({ "success": true, "exitCode": 0, "output": "ok\n" })
    );
}

#[test]
fn outcome_from_error_reports_failure() {
    let failed = VerificationOutcome::from_error(&VerificationError::Failed {
        exit_code: 2,
        output: String::from("1 failure\n"),
    });
    assert!(!failed.success());
    assert_eq!(failed.exit_code(), 2);
    assert_eq!(failed.output(), "1 failure\n");

    let aborted = VerificationOutcome::from_error(&VerificationError::Aborted {
        message: String::from("cancelled"),
    });
    assert_eq!(aborted.exit_code(), -1);
    assert_eq!(aborted.output(), "");
}
