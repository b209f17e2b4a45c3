//! Transcript sanitisation for verification engine output.
//!
//! The engine interleaves genuine results with tooling noise: comment lines
//! and echoes of its own launcher command. [`OutputFilter`] removes that
//! noise and collapses runs of blank lines so the transcript handed back to
//! callers stays readable.
//!
//! The filter is line-oriented:
//!
//! - a line beginning with `#` is a comment; it and everything after it is
//!   discarded, while a `#` elsewhere in a line is preserved;
//! - a line containing a launcher-echo marker is discarded in full, along
//!   with everything after it;
//! - two or more consecutive line breaks collapse into one.
//!
//! Filtering is pure and idempotent.

/// Echo printed when the engine re-invokes its own launcher.
pub const LAUNCHER_ECHO_MARKER: &str = "bundle exec rake pact:verify";

/// Character that marks a line as a comment when it begins the line.
pub const COMMENT_MARKER: char = '#';

/// Stateless transcript filter.
///
/// # Example
///
/// ```
/// use pact_verifier::OutputFilter;
///
/// let filter = OutputFilter::new();
/// assert_eq!(
///     filter.filter("1 interaction, 0 failures\n# rerun with --verbose"),
///     "1 interaction, 0 failures\n",
/// );
/// assert_eq!(filter.filter("issue #42 is fixed"), "issue #42 is fixed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFilter {
    echo_markers: Vec<String>,
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self {
            echo_markers: vec![String::from(LAUNCHER_ECHO_MARKER)],
        }
    }
}

impl OutputFilter {
    /// Creates a filter recognising the default launcher echo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds another launcher-echo marker. Empty markers are ignored.
    #[must_use]
    pub fn with_echo_marker(mut self, marker: impl Into<String>) -> Self {
        let text = marker.into();
        if !text.is_empty() && !self.echo_markers.contains(&text) {
            self.echo_markers.push(text);
        }
        self
    }

    /// Returns the launcher-echo markers this filter recognises.
    #[must_use]
    pub fn echo_markers(&self) -> &[String] {
        &self.echo_markers
    }

    /// Removes noise from a raw transcript.
    #[must_use]
    pub fn filter(&self, raw: &str) -> String {
        let mut kept = String::with_capacity(raw.len());
        for line in raw.split_inclusive('\n') {
            if self.is_noise(line) {
                break;
            }
            kept.push_str(line);
        }
        collapse_line_breaks(&kept)
    }

    fn is_noise(&self, line: &str) -> bool {
        line.starts_with(COMMENT_MARKER)
            || self
                .echo_markers
                .iter()
                .any(|marker| line.contains(marker.as_str()))
    }
}

/// Filters a transcript with the default [`OutputFilter`].
#[must_use]
pub fn filter_transcript(raw: &str) -> String {
    OutputFilter::default().filter(raw)
}

fn collapse_line_breaks(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut after_break = false;
    for line in text.split_inclusive('\n') {
        let blank = line == "\n" || line == "\r\n";
        if blank && after_break {
            continue;
        }
        collapsed.push_str(line);
        after_break = line.ends_with('\n');
    }
    collapsed
}
