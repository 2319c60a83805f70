//! User-assembled interpreter definition.

use super::{ExitStrategy, Interpreter};
use crate::channel::{Marker, MarkerSet};

/// An interpreter described entirely at runtime.
///
/// # Example
///
/// ```rust
/// use sshrepl::interpreter::{CustomInterpreter, ExitStrategy};
///
/// let sqlite = CustomInterpreter::new("sqlite3", "sqlite3 /tmp/app.db", ["sqlite> ", "   ...> "])
///     .with_error_marker("Error:")
///     .with_exit_strategy(ExitStrategy::graceful(".quit"));
/// ```
#[derive(Debug, Clone)]
pub struct CustomInterpreter {
    name: String,
    launch_command: String,
    ready_marker: MarkerSet,
    error_marker: Option<Marker>,
    strip_commands: bool,
    exit_strategy: ExitStrategy,
}

impl CustomInterpreter {
    /// Create an interpreter that exits on Ctrl-D and has no error marker.
    pub fn new(
        name: impl Into<String>,
        launch_command: impl Into<String>,
        ready_marker: impl Into<MarkerSet>,
    ) -> Self {
        Self {
            name: name.into(),
            launch_command: launch_command.into(),
            ready_marker: ready_marker.into(),
            error_marker: None,
            strip_commands: true,
            exit_strategy: ExitStrategy::signal('d'),
        }
    }

    pub fn with_error_marker(mut self, marker: impl Into<Marker>) -> Self {
        self.error_marker = Some(marker.into());
        self
    }

    pub fn with_strip_commands(mut self, strip: bool) -> Self {
        self.strip_commands = strip;
        self
    }

    pub fn with_exit_strategy(mut self, strategy: ExitStrategy) -> Self {
        self.exit_strategy = strategy;
        self
    }
}

impl Interpreter for CustomInterpreter {
    fn name(&self) -> &str {
        &self.name
    }

    fn launch_command(&self) -> &str {
        &self.launch_command
    }

    fn ready_marker(&self) -> &MarkerSet {
        &self.ready_marker
    }

    fn error_marker(&self) -> Option<&Marker> {
        self.error_marker.as_ref()
    }

    fn strip_commands(&self) -> bool {
        self.strip_commands
    }

    fn exit_strategy(&self) -> &ExitStrategy {
        &self.exit_strategy
    }
}
