//! Interactive interpreter sessions.
//!
//! A [`Session`] owns one [`Terminal`] and walks it through the lifecycle
//!
//! ```text
//! Connected --login()--> Ready --run()*--> logout(self) -> Closed
//!      \                   \
//!       +----- fatal error -+--> Dead
//! ```
//!
//! Login, command execution and logout are implemented as free functions in
//! [`login`], [`executor`] and [`logout`] so they can be driven against any
//! terminal; the session adds state tracking and resource cleanup.

mod batch;
mod builder;
mod credentials;
pub mod executor;
pub mod login;
pub mod logout;
mod options;
mod response;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::channel::{MarkerSet, Terminal};
use crate::error::{LogoutError, Result, SessionError};
use crate::interpreter::Interpreter;

pub use batch::CommandBatch;
pub use builder::SessionBuilder;
pub use credentials::Credentials;
pub use login::{LoginPolicy, LoginPrompt, Ready};
pub use options::{DEFAULT_TIMEOUT, ResolvedOptions, RunOptions};
pub use response::ExecutionResult;

/// Wait bound for each logout step.
pub const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shell prompt endings recognised by default.
pub const DEFAULT_SHELL_MARKERS: [&str; 3] = ["#", ">", "$"];

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Terminal open, not yet logged in.
    Connected,
    /// Interpreter prompt reached; commands accepted.
    Ready,
    /// Torn down after a fatal error.
    Dead,
}

/// Outcome of [`Session::logout`].
///
/// Teardown is best effort: the terminal is closed regardless, and anything
/// that went wrong on the way is collected here.
#[derive(Debug, Default)]
pub struct Closed {
    pub errors: Vec<LogoutError>,
}

impl Closed {
    /// True if every teardown step succeeded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A live interactive interpreter session.
pub struct Session<T: Terminal> {
    terminal: T,
    credentials: Credentials,
    interpreter: Arc<dyn Interpreter>,
    shell_markers: MarkerSet,
    defaults: RunOptions,
    login_policy: LoginPolicy,
    logout_timeout: Duration,
    state: SessionState,
}

impl<T: Terminal> Session<T> {
    /// Wrap an open terminal. No I/O happens until [`login`](Self::login).
    pub fn new(terminal: T, credentials: Credentials, interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            terminal,
            credentials,
            interpreter,
            shell_markers: MarkerSet::from(DEFAULT_SHELL_MARKERS),
            defaults: RunOptions::default(),
            login_policy: LoginPolicy::default(),
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
            state: SessionState::Connected,
        }
    }

    pub fn with_shell_markers(mut self, markers: impl Into<MarkerSet>) -> Self {
        self.shell_markers = markers.into();
        self
    }

    /// Instance defaults applied to every `run`.
    pub fn with_defaults(mut self, defaults: RunOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_login_policy(mut self, policy: LoginPolicy) -> Self {
        self.login_policy = policy;
        self
    }

    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Negotiate login and start the interpreter.
    ///
    /// On failure the terminal is closed and the session becomes
    /// [`SessionState::Dead`].
    pub async fn login(&mut self) -> Result<Ready> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Ready => return Err(SessionError::AlreadyLoggedIn.into()),
            SessionState::Dead => return Err(SessionError::Dead.into()),
        }

        let ready_marker = self.ready_marker();
        let result = login::login(
            &mut self.terminal,
            &self.credentials,
            &self.shell_markers,
            self.interpreter.launch_command(),
            &ready_marker,
            &self.login_policy,
        )
        .await;

        match result {
            Ok(ready) => {
                info!(
                    "{} ready for {} after {} prompt rounds",
                    self.interpreter.name(),
                    self.credentials.username,
                    ready.rounds
                );
                self.state = SessionState::Ready;
                Ok(ready)
            }
            Err(e) => {
                warn!("login failed: {}", e);
                self.kill().await;
                Err(e.into())
            }
        }
    }

    /// Run a batch with the session defaults.
    pub async fn run(&mut self, commands: impl Into<CommandBatch>) -> Result<Vec<ExecutionResult>> {
        self.run_with(commands, RunOptions::default()).await
    }

    /// Run a batch with per-call overrides.
    ///
    /// Results come back in input order. A wait timeout or a lost connection
    /// is fatal: the terminal is closed and the session becomes
    /// [`SessionState::Dead`].
    pub async fn run_with(
        &mut self,
        commands: impl Into<CommandBatch>,
        options: RunOptions,
    ) -> Result<Vec<ExecutionResult>> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Connected => return Err(SessionError::NotReady.into()),
            SessionState::Dead => return Err(SessionError::Dead.into()),
        }

        let batch = commands.into();
        let resolved = options.resolve(&self.defaults, self.interpreter.as_ref());
        debug!("running {} command(s) until {}", batch.len(), resolved.marker);

        match executor::run_batch(&mut self.terminal, &batch, &resolved).await {
            Ok(results) => Ok(results),
            Err(e) => {
                warn!("batch aborted: {}", e);
                self.kill().await;
                Err(e.into())
            }
        }
    }

    /// Leave the interpreter and the shell, then close the terminal.
    ///
    /// Never fails: problems along the way are logged and returned in
    /// [`Closed::errors`].
    pub async fn logout(mut self) -> Closed {
        let mut closed = Closed::default();

        if self.state == SessionState::Ready {
            let ready_marker = self.ready_marker();
            let result = logout::logout(
                &mut self.terminal,
                self.interpreter.exit_strategy(),
                &ready_marker,
                &self.shell_markers,
                self.logout_timeout,
            )
            .await;
            if let Err(e) = result {
                warn!("logout handshake incomplete: {}", e);
                closed.errors.push(e);
            }
        }

        if self.state != SessionState::Dead {
            if let Err(e) = self.terminal.close().await {
                warn!("failed to close terminal: {}", e);
                closed.errors.push(LogoutError::Close(e));
            }
            self.state = SessionState::Dead;
        }

        debug!("session closed with {} error(s)", closed.errors.len());
        closed
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn interpreter(&self) -> &Arc<dyn Interpreter> {
        &self.interpreter
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn shell_markers(&self) -> &MarkerSet {
        &self.shell_markers
    }

    pub fn defaults(&self) -> &RunOptions {
        &self.defaults
    }

    pub fn login_policy(&self) -> &LoginPolicy {
        &self.login_policy
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// The interpreter prompt, honouring an instance-level marker override.
    fn ready_marker(&self) -> MarkerSet {
        self.defaults
            .marker
            .clone()
            .unwrap_or_else(|| self.interpreter.ready_marker().clone())
    }

    async fn kill(&mut self) {
        if let Err(e) = self.terminal.close().await {
            warn!("failed to close terminal: {}", e);
        }
        self.state = SessionState::Dead;
    }
}

impl<T: Terminal> Drop for Session<T> {
    fn drop(&mut self) {
        if self.state != SessionState::Dead {
            warn!(
                "session for {} dropped without logout",
                self.credentials.username
            );
        }
    }
}

impl<T: Terminal> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.credentials.username)
            .field("interpreter", &self.interpreter.name())
            .field("shell_markers", &self.shell_markers.to_string())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::channel::mock::ScriptedTerminal;
    use crate::error::{Error, ExecutionError, LoginError};
    use crate::interpreter::builtin::Python3;

    fn session(terminal: ScriptedTerminal) -> Session<ScriptedTerminal> {
        Session::new(
            terminal,
            Credentials::new("admin").with_password("s3cret"),
            Arc::new(Python3::new()),
        )
        .with_defaults(RunOptions::new().timeout(Duration::from_secs(1)))
    }

    fn logged_in(script: ScriptedTerminal) -> ScriptedTerminal {
        ScriptedTerminal::new()
            .output("Last login: today\r\nuser@host:~$ ")
            .output("python3\r\nPython 3.12.3\r\n>>> ")
            .then(script)
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let term = logged_in(
            ScriptedTerminal::new()
                .output("2+2\r\n4\r\n>>> ")
                .output("\r\n>>> ")
                .output("exit()\r\nuser@host:~$ "),
        );
        let log = term.transcript();
        let mut s = session(term);

        assert_ok!(s.login().await);
        assert!(s.is_ready());

        let results = s.run("2+2").await.unwrap();
        assert_eq!(results[0].output, "4\n");

        let closed = s.logout().await;
        assert!(closed.is_clean());

        let log = log.lock().unwrap();
        assert_eq!(log.lines(), vec!["python3", "2+2", "", "exit()", "exit"]);
        assert!(log.closed);
    }

    #[tokio::test]
    async fn test_login_then_logout_without_commands() {
        let term = logged_in(
            ScriptedTerminal::new()
                .output("\r\n>>> ")
                .output("exit()\r\nuser@host:~$ "),
        );
        let log = term.transcript();
        let mut s = session(term);

        s.login().await.unwrap();
        let closed = s.logout().await;

        assert!(closed.is_clean());
        assert!(log.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn test_run_before_login() {
        let mut s = session(ScriptedTerminal::new());
        let err = s.run("2+2").await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotReady)));
        assert_eq!(s.state(), SessionState::Connected);
        s.logout().await;
    }

    #[tokio::test]
    async fn test_double_login() {
        let mut s = session(logged_in(ScriptedTerminal::new()));
        s.login().await.unwrap();
        let err = s.login().await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::AlreadyLoggedIn)));
        s.logout().await;
    }

    #[tokio::test]
    async fn test_login_failure_closes_terminal() {
        let term = ScriptedTerminal::new().output("nothing useful\r\n");
        let log = term.transcript();
        let mut s = session(term).with_login_policy(LoginPolicy {
            prompt_timeout: Duration::from_millis(10),
            ..Default::default()
        });

        let err = s.login().await.unwrap_err();
        assert!(matches!(err, Error::Login(LoginError::Timeout { .. })));
        assert_eq!(s.state(), SessionState::Dead);
        assert!(log.lock().unwrap().closed);

        let err = s.login().await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::Dead)));
    }

    #[tokio::test]
    async fn test_command_timeout_kills_session() {
        let term = logged_in(ScriptedTerminal::new().output("import time; time.sleep(60)\r\n"));
        let log = term.transcript();
        let mut s = session(term);
        s.login().await.unwrap();

        let err = s.run(["import time; time.sleep(60)", "print(1)"]).await.unwrap_err();
        assert!(matches!(err, Error::Execution(ExecutionError::Timeout { index: 0, .. })));
        assert_eq!(s.state(), SessionState::Dead);
        assert_err!(s.run("print(2)").await);

        let closed = s.logout().await;
        assert!(closed.is_clean());
        let log = log.lock().unwrap();
        assert!(log.closed);
        // No logout handshake on a dead session.
        assert_eq!(log.lines(), vec!["python3", "import time; time.sleep(60)"]);
    }

    #[tokio::test]
    async fn test_logout_collects_timeouts() {
        let term = logged_in(ScriptedTerminal::new().output("\r\n>>> "));
        let log = term.transcript();
        let mut s = session(term).with_logout_timeout(Duration::from_millis(10));
        s.login().await.unwrap();

        let closed = s.logout().await;
        assert_eq!(closed.errors.len(), 1);
        assert!(matches!(closed.errors[0], LogoutError::Timeout { .. }));
        let log = log.lock().unwrap();
        assert_eq!(log.lines().last(), Some(&"exit"));
        assert!(log.closed);
    }

    #[tokio::test]
    async fn test_run_with_overrides() {
        let term = logged_in(
            ScriptedTerminal::new()
                .output("def f():\r\n... ")
                .output("    return 1\r\n... ")
                .output("\r\n>>> "),
        );
        let mut s = session(term);
        s.login().await.unwrap();

        let batch = vec!["def f():", "    return 1", ""];
        let results = s
            .run_with(batch, RunOptions::new().marker([">>>", "..."]))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].prompt, "...");
        assert_eq!(results[2].prompt, ">>>");
        s.logout().await;
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let term = logged_in(ScriptedTerminal::new());
        let log = term.transcript();
        let mut s = session(term);
        s.login().await.unwrap();

        let results = s.run("\n\n").await.unwrap();
        assert!(results.is_empty());
        assert_eq!(log.lock().unwrap().lines(), vec!["python3"]);
        s.logout().await;
    }
}
