//! Verification configuration and the rules deciding whether a run is
//! well-formed.
//!
//! [`RawConfig`] is the caller-facing record, deserialisable from camelCase
//! JSON. [`validate`] checks it against a fixed rule set, first failure
//! wins, and produces an immutable [`VerifierConfig`]. Validation performs no
//! I/O beyond filesystem existence checks for local contract locations;
//! remote locations are never contacted here.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ConfigurationError;

/// Tracing target for configuration validation.
const CONFIG_TARGET: &str = "pact_verifier::config";

/// Placeholder used wherever a secret would otherwise be rendered.
pub(crate) const REDACTED: &str = "******";

/// Verification settings as supplied by the caller, before validation.
///
/// # Example
///
/// ```
/// use pact_verifier::RawConfig;
///
/// let raw: RawConfig = serde_json::from_str(
///     r#"{"providerBaseUrl": "http://localhost:8080", "pactUrls": ["http://broker/pacts/1"]}"#,
/// ).expect("valid JSON");
/// assert_eq!(raw.pact_urls.len(), 1);
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawConfig {
    /// Base URL of the provider under test.
    pub provider_base_url: Option<String>,
    /// Contract locations: local paths or remote URLs.
    pub pact_urls: Vec<String>,
    /// Endpoint the engine queries for declared provider states.
    pub provider_states_url: Option<String>,
    /// Endpoint the engine calls to set up a provider state.
    pub provider_states_setup_url: Option<String>,
    /// Engine operation budget in milliseconds.
    pub timeout: Option<i64>,
    /// Username for broker-hosted contracts.
    pub pact_broker_username: Option<String>,
    /// Password for broker-hosted contracts.
    pub pact_broker_password: Option<String>,
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("provider_base_url", &self.provider_base_url)
            .field("pact_urls", &self.pact_urls)
            .field("provider_states_url", &self.provider_states_url)
            .field("provider_states_setup_url", &self.provider_states_setup_url)
            .field("timeout", &self.timeout)
            .field("pact_broker_username", &self.pact_broker_username)
            .field(
                "pact_broker_password",
                &self.pact_broker_password.as_ref().map(|_| REDACTED),
            )
            .finish()
    }
}

impl RawConfig {
    /// Validates this record; see [`validate`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] encountered.
    pub fn validate(&self) -> Result<VerifierConfig, ConfigurationError> {
        validate(self)
    }
}

/// Where a contract document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PactSource {
    /// A file or directory on the local filesystem.
    Local(PathBuf),
    /// A document fetched by the engine at run time.
    Remote(Url),
}

impl PactSource {
    /// Classifies a contract location.
    ///
    /// A location is remote when it parses as an absolute URL with a host
    /// and a scheme other than `file`. `file://` URLs resolve to their local
    /// path; anything else is treated as a local path verbatim.
    ///
    /// # Example
    ///
    /// ```
    /// use pact_verifier::PactSource;
    ///
    /// assert!(PactSource::classify("https://broker/pacts/latest").is_remote());
    /// assert!(!PactSource::classify("pacts/consumer-provider.json").is_remote());
    /// ```
    #[must_use]
    pub fn classify(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_or_else(|()| Self::Local(PathBuf::from(location)), Self::Local),
            Ok(url) if url.host().is_some() => Self::Remote(url),
            _ => Self::Local(PathBuf::from(location)),
        }
    }

    /// Returns `true` for remote locations.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Returns the location as passed to the engine.
    #[must_use]
    pub fn to_engine_arg(&self) -> String {
        match self {
            Self::Local(path) => path.to_string_lossy().into_owned(),
            Self::Remote(url) => url.as_str().to_owned(),
        }
    }
}

impl fmt::Display for PactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_engine_arg())
    }
}

/// Paired provider-state endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStates {
    url: String,
    setup_url: String,
}

impl ProviderStates {
    /// Returns the URL listing declared provider states.
    #[must_use]
    pub const fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the URL that triggers state setup.
    #[must_use]
    pub const fn setup_url(&self) -> &str {
        self.setup_url.as_str()
    }
}

/// Paired broker credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerCredentials {
    username: String,
    password: String,
}

impl BrokerCredentials {
    /// Returns the broker username.
    #[must_use]
    pub const fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns the broker password.
    #[must_use]
    pub const fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// A validated, immutable verification configuration.
///
/// Only [`validate`] constructs values of this type, so holding one proves
/// every rule passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    provider_base_url: String,
    pact_sources: Vec<PactSource>,
    provider_states: Option<ProviderStates>,
    timeout: Option<Duration>,
    broker_credentials: Option<BrokerCredentials>,
}

impl VerifierConfig {
    /// Returns the provider base URL exactly as supplied.
    #[must_use]
    pub const fn provider_base_url(&self) -> &str {
        self.provider_base_url.as_str()
    }

    /// Returns the contract locations in caller order.
    #[must_use]
    pub fn pact_sources(&self) -> &[PactSource] {
        &self.pact_sources
    }

    /// Returns the provider-state endpoints, if configured.
    #[must_use]
    pub const fn provider_states(&self) -> Option<&ProviderStates> {
        self.provider_states.as_ref()
    }

    /// Returns the engine operation budget, if configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the broker credentials, if configured.
    #[must_use]
    pub const fn broker_credentials(&self) -> Option<&BrokerCredentials> {
        self.broker_credentials.as_ref()
    }
}

/// Validates a raw configuration.
///
/// Rules are evaluated in order and the first failure wins:
///
/// 1. the provider base URL is present and absolute;
/// 2. at least one contract location is supplied;
/// 3. provider-state URLs are supplied together or not at all;
/// 4. the timeout is non-negative;
/// 5. every local contract location exists;
/// 6. provider-state URLs are absolute;
/// 7. broker credentials are supplied together or not at all.
///
/// # Errors
///
/// Returns the [`ConfigurationError`] for the first rule that fails.
///
/// # Example
///
/// ```
/// use pact_verifier::{RawConfig, validate};
///
/// let raw = RawConfig {
///     provider_base_url: Some("http://localhost".into()),
///     pact_urls: vec!["http://idontexist".into()],
///     ..RawConfig::default()
/// };
/// let config = validate(&raw).expect("remote locations are not checked");
/// assert_eq!(config.provider_base_url(), "http://localhost");
/// ```
pub fn validate(raw: &RawConfig) -> Result<VerifierConfig, ConfigurationError> {
    let result = apply_rules(raw);
    if let Err(error) = &result {
        debug!(
            target: CONFIG_TARGET,
            %error,
            "rejected verification configuration"
        );
    }
    result
}

fn apply_rules(raw: &RawConfig) -> Result<VerifierConfig, ConfigurationError> {
    let provider_base_url = require_provider_base_url(raw.provider_base_url.as_deref())?;
    if raw.pact_urls.is_empty() {
        return Err(ConfigurationError::NoPactUrls);
    }
    let state_urls = pair(
        raw.provider_states_url.as_deref(),
        raw.provider_states_setup_url.as_deref(),
    )
    .ok_or(ConfigurationError::UnpairedProviderStates)?;
    let timeout = raw.timeout.map(timeout_from_millis).transpose()?;
    let pact_sources = raw
        .pact_urls
        .iter()
        .map(|location| resolve_pact_source(location))
        .collect::<Result<Vec<_>, _>>()?;
    let provider_states = state_urls
        .map(|(url, setup_url)| provider_states(url, setup_url))
        .transpose()?;
    let broker_credentials = pair(
        raw.pact_broker_username.as_deref(),
        raw.pact_broker_password.as_deref(),
    )
    .ok_or(ConfigurationError::UnpairedBrokerCredentials)?
    .map(|(username, password)| BrokerCredentials {
        username: username.to_owned(),
        password: password.to_owned(),
    });

    Ok(VerifierConfig {
        provider_base_url,
        pact_sources,
        provider_states,
        timeout,
        broker_credentials,
    })
}

fn require_provider_base_url(value: Option<&str>) -> Result<String, ConfigurationError> {
    match value {
        Some(text) if is_absolute_url(text) => Ok(text.to_owned()),
        _ => Err(ConfigurationError::InvalidProviderBaseUrl {
            value: value.map(str::to_owned),
        }),
    }
}

fn is_absolute_url(text: &str) -> bool {
    Url::parse(text).is_ok_and(|url| !url.cannot_be_a_base())
}

/// Returns `None` when exactly one side is present.
fn pair<'a>(
    first: Option<&'a str>,
    second: Option<&'a str>,
) -> Option<Option<(&'a str, &'a str)>> {
    match (first, second) {
        (Some(left), Some(right)) => Some(Some((left, right))),
        (None, None) => Some(None),
        _ => None,
    }
}

fn timeout_from_millis(millis: i64) -> Result<Duration, ConfigurationError> {
    u64::try_from(millis)
        .map(Duration::from_millis)
        .map_err(|_| ConfigurationError::InvalidTimeout { value: millis })
}

fn resolve_pact_source(location: &str) -> Result<PactSource, ConfigurationError> {
    let source = PactSource::classify(location);
    if let PactSource::Local(path) = &source {
        ensure_exists(path)?;
    }
    Ok(source)
}

fn ensure_exists(path: &Path) -> Result<(), ConfigurationError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigurationError::PactFileNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn provider_states(url: &str, setup_url: &str) -> Result<ProviderStates, ConfigurationError> {
    for candidate in [url, setup_url] {
        if !is_absolute_url(candidate) {
            return Err(ConfigurationError::InvalidProviderStatesUrl {
                value: candidate.to_owned(),
            });
        }
    }
    Ok(ProviderStates {
        url: url.to_owned(),
        setup_url: setup_url.to_owned(),
    })
}
