//! Crate-level behavioural tests.

mod behaviour;

use crate::{RawConfig, verifier};

#[test]
fn verifier_uses_default_engine() {
    let raw = RawConfig {
        provider_base_url: Some("http://localhost".into()),
        pact_urls: vec!["http://idontexist".into()],
        ..RawConfig::default()
    };
    let task = verifier(&raw).expect("valid configuration");
    assert_eq!(task.config().pact_sources().len(), 1);
}

#[test]
fn verifier_rejects_invalid_configuration() {
    let raw = RawConfig {
        pact_urls: vec!["http://idontexist".into()],
        ..RawConfig::default()
    };
    assert!(verifier(&raw).is_err());
}
