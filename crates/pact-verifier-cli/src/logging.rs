//! Format of the diagnostics written to stderr.
//!
//! Parsed from `--log-format`; the engine transcript on stdout is never
//! affected.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rendering used by the tracing subscriber.
///
/// Accepts `json` or `compact` in any case.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for CI log collectors.
    #[default]
    Json,
    /// Terse text lines for reading a run in a terminal.
    Compact,
}
