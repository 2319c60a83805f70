//! Python 3 interactive interpreter.
//!
//! # Prompt Examples
//!
//! ```text
//! >>> 2+2
//! 4
//! >>> for i in range(2):
//! ...     print(i)
//! ...
//! ```
//!
//! Only the primary `>>>` prompt is a ready marker by default. Multi-line
//! blocks need the continuation prompt as well; see
//! [`Python3::with_continuation`].

use crate::channel::{Marker, MarkerSet};
use crate::interpreter::{ExitStrategy, Interpreter};

/// Interpreter name for Python 3.
pub const NAME: &str = "python3";

/// The `python3` REPL.
#[derive(Debug, Clone)]
pub struct Python3 {
    launch_command: String,
    ready_marker: MarkerSet,
    error_marker: Marker,
    exit_strategy: ExitStrategy,
}

impl Python3 {
    pub fn new() -> Self {
        Self {
            launch_command: "python3".to_string(),
            ready_marker: MarkerSet::from(">>>"),
            // Tracebacks end in e.g. "NameError: name 'x' is not defined"
            error_marker: Marker::literal("Error"),
            exit_strategy: ExitStrategy::graceful("exit()"),
        }
    }

    /// Use a different launch command, e.g. `python3 -q` or a venv path.
    pub fn with_launch_command(mut self, command: impl Into<String>) -> Self {
        self.launch_command = command.into();
        self
    }

    /// Also treat the `...` continuation prompt as ready.
    pub fn with_continuation(mut self) -> Self {
        self.ready_marker.push("...");
        self
    }

    /// Leave with Ctrl-D instead of `exit()`.
    pub fn with_signal_exit(mut self) -> Self {
        self.exit_strategy = ExitStrategy::signal('d');
        self
    }
}

impl Default for Python3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter for Python3 {
    fn name(&self) -> &str {
        NAME
    }

    fn launch_command(&self) -> &str {
        &self.launch_command
    }

    fn ready_marker(&self) -> &MarkerSet {
        &self.ready_marker
    }

    fn error_marker(&self) -> Option<&Marker> {
        Some(&self.error_marker)
    }

    fn exit_strategy(&self) -> &ExitStrategy {
        &self.exit_strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python3_defaults() {
        let py = Python3::new();
        assert_eq!(py.name(), "python3");
        assert_eq!(py.launch_command(), "python3");
        assert!(py.ready_marker().find_first(b"4\r\n>>> ").is_some());
        assert!(py.strip_commands());
        assert_eq!(py.exit_strategy(), &ExitStrategy::graceful("exit()"));
    }

    #[test]
    fn test_error_marker_matches_traceback() {
        let py = Python3::new();
        let traceback = "Traceback (most recent call last):\n  File \"<stdin>\", line 1, in <module>\nZeroDivisionError: division by zero\n";
        assert_eq!(py.error_marker().unwrap().find_str(traceback), Some("Error"));
        assert!(py.error_marker().unwrap().find_str("4\n").is_none());
    }

    #[test]
    fn test_continuation_prompt() {
        let py = Python3::new().with_continuation();
        let m = py.ready_marker().find_first(b"... ").unwrap();
        assert_eq!(m.index, 1);
    }

    #[test]
    fn test_signal_exit() {
        let py = Python3::new().with_signal_exit();
        assert_eq!(py.exit_strategy(), &ExitStrategy::signal('d'));
    }
}
