//! Connection settings for the SSH transport.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// What to do with the server's host key, in the spirit of OpenSSH's
/// `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Only hosts already in known_hosts are accepted.
    Strict,

    /// Unknown hosts are learned and accepted; changed keys are refused.
    #[default]
    AcceptNew,

    /// Any key is accepted. Lab use only.
    Disabled,
}

/// Protocol-level credentials.
///
/// Independent of these, the login negotiator answers in-band password
/// prompts on the shell itself.
#[derive(Debug)]
pub enum AuthMethod {
    /// `none` method; the target is expected to prompt in-band.
    None,

    /// `password`, falling back to keyboard-interactive.
    Password(SecretString),

    /// Public key from a file, optionally encrypted.
    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

/// Where and how to connect.
#[derive(Debug)]
pub struct SshConfig {
    pub host: String,

    pub port: u16,

    pub username: String,

    pub auth: AuthMethod,

    /// Bound on TCP connect plus key exchange.
    pub timeout: Duration,

    /// PTY columns. Wide enough that echoed commands are not wrapped.
    pub terminal_width: u32,

    /// PTY rows.
    pub terminal_height: u32,

    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Settings for `username@host:22` with no protocol auth.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// `host:port`, as used for connecting and in log messages.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
