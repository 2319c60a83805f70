//! Result type for command execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of one command in a batch.
///
/// An error-marker match is reported here as `failed`, never as an `Err`, so
/// one failing command cannot abort the rest of its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The command that was executed.
    pub command: String,

    /// The command output (echo removed if requested, CRLF normalised).
    pub output: String,

    /// Everything received between sending the command and the ready marker.
    pub raw_output: String,

    /// The ready marker text that ended the output window.
    pub prompt: String,

    /// Time from send to ready marker.
    pub elapsed: Duration,

    /// Whether the error marker matched the output.
    pub failed: bool,

    /// The text the error marker matched.
    pub error_match: Option<String>,
}

impl ExecutionResult {
    /// Create a successful result.
    pub fn success(
        command: impl Into<String>,
        output: impl Into<String>,
        raw_output: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            raw_output: raw_output.into(),
            prompt: prompt.into(),
            elapsed,
            failed: false,
            error_match: None,
        }
    }

    /// Create a result whose output matched the error marker.
    pub fn failure(
        command: impl Into<String>,
        output: impl Into<String>,
        raw_output: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
        error_match: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            raw_output: raw_output.into(),
            prompt: prompt.into(),
            elapsed,
            failed: true,
            error_match: Some(error_match.into()),
        }
    }

    /// Check if the command succeeded.
    pub fn is_success(&self) -> bool {
        !self.failed
    }

    /// Get the output lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }

    /// Check if the output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.output.contains(pattern)
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output)
    }
}
