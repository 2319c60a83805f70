//! Ruby's interactive interpreter, `irb`.
//!
//! # Prompt Examples
//!
//! ```text
//! irb(main):001:0> 1 + 1
//! => 2
//! irb(main):002> foo
//! (irb):2:in `<main>': undefined local variable or method `foo' for main (NameError)
//! ```
//!
//! Older releases show the nesting level (`:0`), newer ones omit it; the
//! prompt pattern accepts both. `irb` leaves on end-of-input.

use std::sync::LazyLock;

use crate::channel::{Marker, MarkerSet};
use crate::interpreter::{ExitStrategy, Interpreter};

/// Interpreter name for irb.
pub const NAME: &str = "irb";

static PROMPT: LazyLock<Marker> = LazyLock::new(|| {
    Marker::pattern(r"irb\([^)]*\):\d+(?::\d+)?[>*] ?").expect("irb prompt pattern is valid")
});

/// The `irb` REPL.
#[derive(Debug, Clone)]
pub struct Irb {
    ready_marker: MarkerSet,
    error_marker: Marker,
    exit_strategy: ExitStrategy,
}

impl Irb {
    pub fn new() -> Self {
        Self {
            ready_marker: MarkerSet::from(PROMPT.clone()),
            error_marker: Marker::literal("Error)"),
            exit_strategy: ExitStrategy::signal('d'),
        }
    }
}

impl Default for Irb {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter for Irb {
    fn name(&self) -> &str {
        NAME
    }

    fn launch_command(&self) -> &str {
        // Autocomplete dialogs redraw the line and garble the echo.
        "irb --noautocomplete"
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
