//! # sshrepl
//!
//! Async automation of remote command-line interpreters over SSH.
//!
//! sshrepl logs into a host over an interactive PTY, answers host-key and
//! password prompts, starts an interpreter such as `python3` or `irb`, runs
//! batches of statements at its prompt, and backs out again cleanly.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Prompt-driven login with bounded password retries
//! - Per-command output capture with echo removal and error-marker detection
//! - Literal or regex markers, with earliest-match-wins alternation
//! - Pluggable interpreters (Python 3 and IRB built in)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sshrepl::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sshrepl::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .interpreter("python3")
//!         .connect()
//!         .await?;
//!
//!     session.login().await?;
//!
//!     for result in session.run("import sys\nsys.version").await? {
//!         println!("{} -> {}", result.command, result.output);
//!     }
//!
//!     let closed = session.logout().await;
//!     assert!(closed.is_clean());
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod interpreter;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use channel::{Marker, MarkerSet, Terminal};
pub use error::{Error, Result};
pub use interpreter::builtin::{Irb, Python3};
pub use interpreter::{CustomInterpreter, ExitStrategy, Interpreter, InterpreterRegistry};
pub use session::{
    Closed, CommandBatch, Credentials, ExecutionResult, LoginPolicy, RunOptions, Session,
    SessionBuilder, SessionState,
};
pub use transport::{AuthMethod, HostKeyVerification, SshConfig, SshTerminal};
