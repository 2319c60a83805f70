//! SSH transport: russh connections and the [`Terminal`] built on them.
//!
//! [`SshTerminal`] is the production [`Terminal`]; everything above this
//! module only sees the trait.
//!
//! [`Terminal`]: crate::channel::Terminal

pub mod config;
mod ssh;
mod terminal;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
pub use terminal::SshTerminal;
