//! Per-call run options and their resolution.
//!
//! Every option is resolved with the precedence
//! call-site value > session default > interpreter default, and the
//! timeout falls back to [`DEFAULT_TIMEOUT`].

use std::time::Duration;

use crate::channel::{Marker, MarkerSet};
use crate::interpreter::Interpreter;

/// Timeout for a command when neither the call nor the session sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Optional overrides for command execution.
///
/// Used both as per-call options ([`Session::run_with`]) and as the session's
/// instance defaults ([`SessionBuilder::defaults`]).
///
/// [`Session::run_with`]: super::Session::run_with
/// [`SessionBuilder::defaults`]: super::SessionBuilder::defaults
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ready marker(s) ending each command's output window.
    pub marker: Option<MarkerSet>,

    /// Marker flagging a command's output as failed.
    pub error_marker: Option<Marker>,

    /// Remove the echoed command from the output.
    pub strip_cmds: Option<bool>,

    /// Per-command wait timeout.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(mut self, marker: impl Into<MarkerSet>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn error_marker(mut self, marker: impl Into<Marker>) -> Self {
        self.error_marker = Some(marker.into());
        self
    }

    pub fn strip_cmds(mut self, strip: bool) -> Self {
        self.strip_cmds = Some(strip);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve against the session defaults and the interpreter.
    pub fn resolve(&self, defaults: &RunOptions, interpreter: &dyn Interpreter) -> ResolvedOptions {
        ResolvedOptions {
            marker: self
                .marker
                .as_ref()
                .or(defaults.marker.as_ref())
                .unwrap_or_else(|| interpreter.ready_marker())
                .clone(),
            error_marker: self
                .error_marker
                .as_ref()
                .or(defaults.error_marker.as_ref())
                .or_else(|| interpreter.error_marker())
                .cloned(),
            strip_cmds: self
                .strip_cmds
                .or(defaults.strip_cmds)
                .unwrap_or_else(|| interpreter.strip_commands()),
            timeout: self.timeout.or(defaults.timeout).unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

/// Fully resolved options for one batch.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub marker: MarkerSet,
    pub error_marker: Option<Marker>,
    pub strip_cmds: bool,
    pub timeout: Duration,
}
