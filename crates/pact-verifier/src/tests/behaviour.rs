//! Behaviour-driven tests for verification runs.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use crate::{
    ConfigurationError, EngineLauncher, EngineRun, RawConfig, VerificationError,
    VerificationOutcome, VerificationTask, VerifierConfig,
};

// ---------------------------------------------------------------------------
// Typed wrappers for Gherkin step parameters
// ---------------------------------------------------------------------------

/// A quoted step argument with `\n` escapes expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QuotedText(String);

impl FromStr for QuotedText {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim_matches('"').replace("\\n", "\n")))
    }
}

impl QuotedText {
    fn into_inner(self) -> String {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

/// Engine stand-in that replays a fixed exit and transcript.
struct ScriptedLauncher {
    exit_code: i32,
    transcript: String,
    launches: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineLauncher for ScriptedLauncher {
    async fn launch(&self, _config: &VerifierConfig) -> Result<EngineRun, VerificationError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(EngineRun::exited(self.exit_code, self.transcript.clone()))
    }
}

#[derive(Default)]
struct TestWorld {
    raw: RawConfig,
    engine: Option<(i32, String)>,
    launches: Arc<AtomicUsize>,
    pact_dir: Option<TempDir>,
    rejected: Option<ConfigurationError>,
    result: Option<Result<VerificationOutcome, VerificationError>>,
}

impl TestWorld {
    fn result(&self) -> &Result<VerificationOutcome, VerificationError> {
        self.result
            .as_ref()
            .expect("verification should have been run")
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a provider at {url}")]
fn given_provider(world: &mut TestWorld, url: QuotedText) {
    world.raw.provider_base_url = Some(url.into_inner());
}

#[given("a pact located at {location}")]
fn given_pact_location(world: &mut TestWorld, location: QuotedText) {
    world.raw.pact_urls.push(location.into_inner());
}

#[given("an existing local pact file")]
fn given_existing_pact(world: &mut TestWorld) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("web-api.json");
    std::fs::write(&path, "{}").expect("write pact file");
    world
        .raw
        .pact_urls
        .push(path.to_string_lossy().into_owned());
    world.pact_dir = Some(dir);
}

#[given("a provider states URL {url} without a setup URL")]
fn given_unpaired_states(world: &mut TestWorld, url: QuotedText) {
    world.raw.provider_states_url = Some(url.into_inner());
}

#[given("an engine that exits with code {code} printing {transcript}")]
fn given_engine(world: &mut TestWorld, code: i32, transcript: QuotedText) {
    world.engine = Some((code, transcript.into_inner()));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the verification is run")]
fn when_verification_runs(world: &mut TestWorld) {
    let (exit_code, transcript) = world.engine.clone().expect("engine should be configured");
    let launcher = ScriptedLauncher {
        exit_code,
        transcript,
        launches: Arc::clone(&world.launches),
    };

    match VerificationTask::new(&world.raw, launcher) {
        Ok(task) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime builds");
            world.result = Some(runtime.block_on(async { task.verify().await }));
        }
        Err(error) => world.rejected = Some(error),
    }
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the verification succeeds")]
fn then_succeeds(world: &mut TestWorld) {
    let outcome = world.result().as_ref().expect("verification should pass");
    assert!(outcome.success());
    assert_eq!(outcome.exit_code(), 0);
}

#[then("the verification fails with exit code {code}")]
fn then_fails(world: &mut TestWorld, code: i32) {
    let error = world.result().as_ref().expect_err("verification should fail");
    assert_eq!(error.exit_code(), Some(code), "got: {error}");
}

#[then("the output is {expected}")]
fn then_output(world: &mut TestWorld, expected: QuotedText) {
    let output = match world.result() {
        Ok(outcome) => outcome.output(),
        Err(error) => error.output(),
    };
    assert_eq!(output, expected.into_inner());
}

#[then("configuration is rejected with {fragment}")]
fn then_rejected(world: &mut TestWorld, fragment: QuotedText) {
    let error = world
        .rejected
        .as_ref()
        .expect("configuration should be rejected");
    let needle = fragment.into_inner();
    assert!(
        error.to_string().contains(&needle),
        "expected '{needle}' in '{error}'"
    );
    assert!(world.result.is_none());
}

#[then("the engine was launched {count} times")]
fn then_launch_count(world: &mut TestWorld, count: usize) {
    assert_eq!(world.launches.load(Ordering::SeqCst), count);
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/verification.feature")]
fn verification_behaviour(world: TestWorld) {
    let _ = world;
}
