//! Configuration file loading and flag precedence.
//!
//! A configuration file holds a camelCase JSON [`RawConfig`]. Explicit flags
//! override file values field by field; a non-empty `--pact-urls` list
//! replaces the file's list rather than extending it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pact_verifier::RawConfig;

use crate::cli::Cli;
use crate::errors::AppError;

/// Reads the configuration file, or returns an empty record when none is
/// given.
pub(crate) fn load(path: Option<&Path>) -> Result<RawConfig, AppError> {
    let Some(file) = path else {
        return Ok(RawConfig::default());
    };
    let text = fs::read_to_string(file).map_err(|source| AppError::ReadConfig {
        path: file.to_path_buf(),
        source: Arc::new(source),
    })?;
    serde_json::from_str(&text).map_err(|source| AppError::ParseConfig {
        path: file.to_path_buf(),
        source: Arc::new(source),
    })
}

/// Layers command-line values over `file`.
pub(crate) fn merge(file: RawConfig, cli: &Cli) -> RawConfig {
    let pact_urls = if cli.pact_urls.is_empty() {
        file.pact_urls
    } else {
        cli.pact_urls.clone()
    };
    RawConfig {
        provider_base_url: cli.provider_base_url.clone().or(file.provider_base_url),
        pact_urls,
        provider_states_url: cli.provider_states_url.clone().or(file.provider_states_url),
        provider_states_setup_url: cli
            .provider_states_setup_url
            .clone()
            .or(file.provider_states_setup_url),
        timeout: cli.timeout.or(file.timeout),
        pact_broker_username: cli.broker_username.clone().or(file.pact_broker_username),
        pact_broker_password: cli.broker_password.clone().or(file.pact_broker_password),
    }
}
