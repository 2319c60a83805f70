//! Error types for sshrepl.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for sshrepl operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Login handshake errors
    #[error("Login error: {0}")]
    Login(#[from] LoginError),

    /// Fatal command execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Session lifecycle and configuration errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not present in known_hosts and verification is strict
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Failed to request shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Character has no control-key equivalent
    #[error("No control character for '{0}'")]
    InvalidControl(char),
}

/// Errors raised while negotiating the way into the interpreter.
#[derive(Error, Debug)]
pub enum LoginError {
    /// A wait step did not see any expected prompt in time
    #[error("Login timed out waiting for {stage} after {after:?}")]
    Timeout { stage: LoginStage, after: Duration },

    /// The target kept asking for a password, or none was configured
    #[error("Authentication rejected for user '{user}': {reason}")]
    AuthRejected { user: String, reason: String },

    /// Host-key and password prompts kept coming without reaching a shell
    #[error("No shell prompt after {rounds} prompt rounds")]
    RetriesExhausted { rounds: usize },

    /// The stream closed during login
    #[error("Transport closed during login")]
    TransportClosed,

    /// The terminal reported an error other than timeout or closure
    #[error("Channel error during login: {0}")]
    Channel(#[source] ChannelError),
}

/// The wait step a login timeout happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    /// Waiting for host-key, password or shell prompts.
    Shell,
    /// Waiting for the interpreter's ready marker after launching it.
    Interpreter,
}

impl std::fmt::Display for LoginStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginStage::Shell => write!(f, "shell prompt"),
            LoginStage::Interpreter => write!(f, "interpreter prompt"),
        }
    }
}

/// Fatal errors while executing a command batch.
///
/// A command whose output matches the error marker is *not* an error; it is
/// reported through [`ExecutionResult::failed`](crate::session::ExecutionResult).
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// No ready marker after a command; the session state is unknown
    #[error("Command #{index} '{command}' timed out after {after:?}")]
    Timeout {
        command: String,
        index: usize,
        after: Duration,
    },

    /// The stream closed while waiting for a command to finish
    #[error("Transport closed during command execution")]
    TransportClosed,

    /// The terminal reported an error other than timeout or closure
    #[error("Channel error during command execution: {0}")]
    Channel(#[source] ChannelError),
}

/// Teardown problems. Never fatal: logout closes the transport regardless.
#[derive(Error, Debug)]
pub enum LogoutError {
    /// A teardown wait step timed out
    #[error("Logout timed out waiting for {stage} after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    /// The stream was already gone
    #[error("Transport already closed")]
    TransportClosed,

    /// The terminal reported an error other than timeout or closure
    #[error("Channel error during logout: {0}")]
    Channel(#[source] ChannelError),

    /// Closing the transport failed
    #[error("Failed to close transport: {0}")]
    Close(#[source] TransportError),
}

/// Session lifecycle and configuration errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Commands were submitted before a successful login
    #[error("Session not ready - call login() first")]
    NotReady,

    /// Login was attempted twice
    #[error("Session already logged in")]
    AlreadyLoggedIn,

    /// A fatal error already tore the session down
    #[error("Session is dead after a fatal error")]
    Dead,

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// No built-in interpreter with this name
    #[error("Unknown interpreter: '{name}'")]
    UnknownInterpreter { name: String },
}

/// Result type alias using sshrepl's Error.
pub type Result<T> = std::result::Result<T, Error>;
