//! Interpreter capabilities.
//!
//! An [`Interpreter`] tells the session engine how to start a particular
//! command-line interpreter from the login shell, how to recognise its
//! prompt and its error reports, and how to leave it again. The login,
//! command and logout negotiators are generic; everything
//! interpreter-specific comes through this trait.

pub mod builtin;
mod custom;
mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::{Marker, MarkerSet};

pub use custom::CustomInterpreter;
pub use registry::{InterpreterRegistry, by_name};

/// How to get from the interpreter back to the enclosing shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ExitStrategy {
    /// Flush with an empty line, wait for the prompt, then send `command`.
    Graceful { command: String },

    /// Send a control character (e.g. `'d'` for end-of-input).
    Signal { control: char },
}

impl ExitStrategy {
    pub fn graceful(command: impl Into<String>) -> Self {
        ExitStrategy::Graceful {
            command: command.into(),
        }
    }

    pub fn signal(control: char) -> Self {
        ExitStrategy::Signal { control }
    }
}

/// Capability interface of one target interpreter.
pub trait Interpreter: Send + Sync {
    /// Short name, e.g. `"python3"`.
    fn name(&self) -> &str;

    /// Command sent at the shell prompt to start the interpreter.
    fn launch_command(&self) -> &str;

    /// Prompt(s) shown when the interpreter is idle.
    fn ready_marker(&self) -> &MarkerSet;

    /// Text that marks a command's output as an error report.
    fn error_marker(&self) -> Option<&Marker>;

    /// Whether the echoed command is removed from captured output.
    fn strip_commands(&self) -> bool {
        true
    }

    /// How to leave the interpreter.
    fn exit_strategy(&self) -> &ExitStrategy;
}

impl fmt::Debug for dyn Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("name", &self.name())
            .field("launch_command", &self.launch_command())
            .field("ready_marker", &self.ready_marker().to_string())
            .finish()
    }
}
