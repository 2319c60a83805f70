//! Builder for creating interpreter sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use super::credentials::Credentials;
use super::login::LoginPolicy;
use super::options::RunOptions;
use super::{DEFAULT_LOGOUT_TIMEOUT, DEFAULT_SHELL_MARKERS, Session};
use crate::channel::{MarkerSet, PtyConfig, Terminal};
use crate::error::{Result, SessionError};
use crate::interpreter::builtin::python3;
use crate::interpreter::{Interpreter, InterpreterRegistry};
use crate::transport::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::transport::SshTerminal;

/// Builder for constructing interpreter sessions.
///
/// # Example
///
/// ```rust,no_run
/// use sshrepl::SessionBuilder;
///
/// # async fn example() -> Result<(), sshrepl::Error> {
/// let mut session = SessionBuilder::new("10.0.0.5")
///     .username("admin")
///     .password("secret")
///     .interpreter("python3")
///     .connect()
///     .await?;
///
/// session.login().await?;
/// let results = session.run("2 + 2").await?;
/// assert_eq!(results[0].output.trim(), "4");
/// session.logout().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    login_password: Option<SecretString>,
    interpreter_name: Option<String>,
    custom_interpreter: Option<Arc<dyn Interpreter>>,
    registry: Option<InterpreterRegistry>,
    shell_markers: MarkerSet,
    defaults: RunOptions,
    login_policy: LoginPolicy,
    logout_timeout: Duration,
    timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    pty: PtyConfig,
}

/// Validated builder output.
pub(crate) struct Prepared {
    ssh: SshConfig,
    pty: PtyConfig,
    parts: SessionParts,
}

/// Everything a session needs besides its terminal.
struct SessionParts {
    credentials: Credentials,
    interpreter: Arc<dyn Interpreter>,
    shell_markers: MarkerSet,
    defaults: RunOptions,
    login_policy: LoginPolicy,
    logout_timeout: Duration,
}

impl SessionParts {
    fn into_session<T: Terminal>(self, terminal: T) -> Session<T> {
        Session::new(terminal, self.credentials, self.interpreter)
            .with_shell_markers(self.shell_markers)
            .with_defaults(self.defaults)
            .with_login_policy(self.login_policy)
            .with_logout_timeout(self.logout_timeout)
    }
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            login_password: None,
            interpreter_name: None,
            custom_interpreter: None,
            registry: None,
            shell_markers: MarkerSet::from(DEFAULT_SHELL_MARKERS),
            defaults: RunOptions::default(),
            login_policy: LoginPolicy::default(),
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            pty: PtyConfig::default(),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    ///
    /// The same password answers in-band password prompts during login.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.auth = AuthMethod::Password(SecretString::from(password.clone()));
        self.login_password = Some(SecretString::from(password));
        self
    }

    /// Set only the password for in-band prompts, leaving SSH auth alone.
    pub fn login_password(mut self, password: impl Into<String>) -> Self {
        self.login_password = Some(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Select the interpreter by name (default: "python3").
    pub fn interpreter(mut self, name: impl Into<String>) -> Self {
        self.interpreter_name = Some(name.into());
        self
    }

    /// Use a custom interpreter definition. Takes precedence over a name.
    pub fn custom_interpreter(mut self, interpreter: Arc<dyn Interpreter>) -> Self {
        self.custom_interpreter = Some(interpreter);
        self
    }

    /// Look interpreter names up in this registry instead of the built-ins.
    pub fn registry(mut self, registry: InterpreterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the enclosing shell's prompt markers (default: `#`, `>`, `$`).
    pub fn shell_markers(mut self, markers: impl Into<MarkerSet>) -> Self {
        self.shell_markers = markers.into();
        self
    }

    /// Set the instance-level run defaults.
    pub fn defaults(mut self, defaults: RunOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn login_policy(mut self, policy: LoginPolicy) -> Self {
        self.login_policy = policy;
        self
    }

    pub fn logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Set a custom known_hosts path (default: `~/.ssh/known_hosts`).
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Tune the PTY channel's buffering and line handling.
    pub fn pty_config(mut self, config: PtyConfig) -> Self {
        self.pty = config;
        self
    }

    /// Connect over SSH and open the interactive shell.
    ///
    /// The returned session is connected but not logged in; call
    /// [`Session::login`] next.
    pub async fn connect(self) -> Result<Session<SshTerminal>> {
        let Prepared { ssh, pty, parts } = self.prepare()?;
        let terminal = SshTerminal::connect(ssh, pty).await?;
        Ok(parts.into_session(terminal))
    }

    /// Build a session over an already open terminal.
    pub fn with_terminal<T: Terminal>(self, terminal: T) -> Result<Session<T>> {
        Ok(self.prepare()?.parts.into_session(terminal))
    }

    pub(crate) fn prepare(self) -> Result<Prepared> {
        let username = self.username.ok_or_else(|| SessionError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        if self.shell_markers.is_empty() {
            return Err(SessionError::InvalidConfig {
                message: "At least one shell marker is required".to_string(),
            }
            .into());
        }

        let interpreter = match self.custom_interpreter {
            Some(custom) => custom,
            None => {
                let name = self.interpreter_name.as_deref().unwrap_or(python3::NAME);
                match &self.registry {
                    Some(registry) => registry.resolve(name)?,
                    None => InterpreterRegistry::with_builtins().resolve(name)?,
                }
            }
        };

        let ready_empty = match &self.defaults.marker {
            Some(marker) => marker.is_empty(),
            None => interpreter.ready_marker().is_empty(),
        };
        if ready_empty {
            return Err(SessionError::InvalidConfig {
                message: format!("No ready marker for interpreter '{}'", interpreter.name()),
            }
            .into());
        }

        let mut credentials = Credentials::new(username.clone());
        credentials.password = self.login_password;

        let ssh = SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok(Prepared {
            ssh,
            pty: self.pty,
            parts: SessionParts {
                credentials,
                interpreter,
                shell_markers: self.shell_markers,
                defaults: self.defaults,
                login_policy: self.login_policy,
                logout_timeout: self.logout_timeout,
            },
        })
    }
}
