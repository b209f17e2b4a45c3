//! CLI argument definitions for the provider contract verifier.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pact_verifier::process::DEFAULT_ENGINE;

use crate::logging::LogFormat;

/// Output format for the verification result.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Print the filtered engine transcript followed by a summary line.
    #[default]
    Human,
    /// Print the result as a single JSON object.
    Json,
}

/// Verifies a provider against consumer contracts using an external engine.
#[derive(Parser, Debug)]
#[command(name = "pact-verifier", version)]
pub(crate) struct Cli {
    /// JSON configuration file; flags override its values.
    #[arg(long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,

    /// Base URL of the provider under test.
    #[arg(long, value_name = "URL", env = "PACT_PROVIDER_BASE_URL")]
    pub(crate) provider_base_url: Option<String>,

    /// Contract locations: local paths or URLs, comma separated or repeated.
    #[arg(
        long,
        value_name = "LOCATION",
        value_delimiter = ',',
        env = "PACT_URLS"
    )]
    pub(crate) pact_urls: Vec<String>,

    /// Endpoint listing the provider states.
    #[arg(long, value_name = "URL")]
    pub(crate) provider_states_url: Option<String>,

    /// Endpoint that sets up a provider state.
    #[arg(long, value_name = "URL")]
    pub(crate) provider_states_setup_url: Option<String>,

    /// Engine operation budget in milliseconds.
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    pub(crate) timeout: Option<i64>,

    /// Username for broker-hosted contracts.
    #[arg(long, value_name = "USER", env = "PACT_BROKER_USERNAME")]
    pub(crate) broker_username: Option<String>,

    /// Password for broker-hosted contracts.
    #[arg(
        long,
        value_name = "PASSWORD",
        env = "PACT_BROKER_PASSWORD",
        hide_env_values = true
    )]
    pub(crate) broker_password: Option<String>,

    /// Verification engine executable.
    #[arg(
        long,
        value_name = "PROGRAM",
        env = "PACT_VERIFIER_ENGINE",
        default_value = DEFAULT_ENGINE
    )]
    pub(crate) engine: String,

    /// Argument placed before the engine flags; repeat for several.
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub(crate) engine_args: Vec<String>,

    /// Environment variable for the engine process, as `KEY=VALUE`.
    #[arg(long = "engine-env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) engine_env: Vec<(String, String)>,

    /// Kill the engine if it runs longer than this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub(crate) kill_after: Option<u64>,

    /// Tracing filter expression for diagnostics on stderr.
    #[arg(
        long,
        value_name = "FILTER",
        env = "PACT_VERIFIER_LOG_FILTER",
        default_value = "info"
    )]
    pub(crate) log_filter: String,

    /// Diagnostic log format.
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::default())]
    pub(crate) log_format: LogFormat,

    /// Controls how the verification result is rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub(crate) output: OutputFormat,
}

pub(crate) fn parse_key_value(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got '{text}'")),
    }
}
