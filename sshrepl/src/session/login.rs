//! Login negotiation: from a fresh shell channel to the interpreter prompt.
//!
//! The negotiator waits on an ordered candidate list:
//!
//! ```text
//! 0  host-key confirmation   -> send "yes", keep waiting
//! 1  password prompt         -> send password, keep waiting
//! 2+ enclosing shell prompt  -> launch the interpreter
//! ```
//!
//! and then, separately, for the interpreter's own ready marker.

use std::time::Duration;

use log::{debug, warn};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::credentials::Credentials;
use crate::channel::{Marker, MarkerSet, Terminal};
use crate::error::{ChannelError, LoginError, LoginStage};

/// Text of the first-connection host-key question.
pub const HOST_KEY_PROMPT: &str = "Are you sure you want to continue connecting";

/// Matches both `Password:` and `password:`.
pub const PASSWORD_PROMPT: &str = "assword";

/// Bounds and timeouts for the login handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginPolicy {
    /// Wait for host-key, password or shell prompts.
    pub prompt_timeout: Duration,

    /// Wait for the interpreter prompt after launching it.
    pub interpreter_timeout: Duration,

    /// Prompt rounds before giving up on reaching a shell.
    pub max_rounds: usize,

    /// Password prompts answered before the login counts as rejected.
    pub max_password_attempts: usize,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(10),
            interpreter_timeout: Duration::from_secs(10),
            max_rounds: 8,
            max_password_attempts: 3,
        }
    }
}

/// What the login candidate list matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPrompt {
    HostKeyPrompt,
    PasswordPrompt,
    /// Index into the shell marker set.
    ShellReady(usize),
}

impl LoginPrompt {
    /// Candidate list in priority order: host key, password, shell markers.
    pub fn candidates(shell_markers: &MarkerSet) -> MarkerSet {
        MarkerSet::new()
            .with(Marker::literal(HOST_KEY_PROMPT))
            .with(Marker::literal(PASSWORD_PROMPT))
            .chain(shell_markers)
    }

    /// Classify an index into the list built by [`candidates`](Self::candidates).
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => LoginPrompt::HostKeyPrompt,
            1 => LoginPrompt::PasswordPrompt,
            n => LoginPrompt::ShellReady(n - 2),
        }
    }
}

/// Proof of a completed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ready {
    /// The interpreter prompt that was matched.
    pub prompt: String,

    /// Prompt rounds it took to reach the shell.
    pub rounds: usize,

    /// Passwords sent along the way.
    pub passwords_sent: usize,
}

/// Drive the login handshake and launch the interpreter.
pub async fn login<T: Terminal>(
    terminal: &mut T,
    credentials: &Credentials,
    shell_markers: &MarkerSet,
    launch_command: &str,
    ready_marker: &MarkerSet,
    policy: &LoginPolicy,
) -> Result<Ready, LoginError> {
    let candidates = LoginPrompt::candidates(shell_markers);
    let mut passwords_sent = 0;
    let mut rounds = 0;

    loop {
        if rounds == policy.max_rounds {
            warn!("no shell prompt after {} rounds", rounds);
            return Err(LoginError::RetriesExhausted { rounds });
        }
        rounds += 1;

        let m = terminal
            .expect(&candidates, policy.prompt_timeout)
            .await
            .map_err(|e| wait_error(e, LoginStage::Shell))?;

        match LoginPrompt::from_index(m.index) {
            LoginPrompt::HostKeyPrompt => {
                debug!("login: accepting host key");
                terminal.send_line("yes").await.map_err(send_error)?;
            }
            LoginPrompt::PasswordPrompt => {
                let Some(password) = credentials.password.as_ref() else {
                    return Err(LoginError::AuthRejected {
                        user: credentials.username.clone(),
                        reason: "password requested but none configured".to_string(),
                    });
                };
                if passwords_sent == policy.max_password_attempts {
                    return Err(LoginError::AuthRejected {
                        user: credentials.username.clone(),
                        reason: format!("password prompted again after {passwords_sent} attempts"),
                    });
                }
                debug!("login: answering password prompt <hidden>");
                terminal.wait_no_echo().await.map_err(send_error)?;
                terminal
                    .send_line(password.expose_secret())
                    .await
                    .map_err(send_error)?;
                passwords_sent += 1;
            }
            LoginPrompt::ShellReady(which) => {
                debug!(
                    "login: shell prompt {:?} (marker #{}) after {} rounds",
                    m.matched, which, rounds
                );
                break;
            }
        }
    }

    debug!("login: launching '{}'", launch_command);
    terminal.send_line(launch_command).await.map_err(send_error)?;

    let m = terminal
        .expect(ready_marker, policy.interpreter_timeout)
        .await
        .map_err(|e| wait_error(e, LoginStage::Interpreter))?;

    debug!("login: interpreter ready at {:?}", m.matched);
    Ok(Ready {
        prompt: m.matched,
        rounds,
        passwords_sent,
    })
}

fn wait_error(error: ChannelError, stage: LoginStage) -> LoginError {
    match error {
        ChannelError::PatternTimeout(after) => LoginError::Timeout { stage, after },
        ChannelError::Closed => LoginError::TransportClosed,
        other => LoginError::Channel(other),
    }
}

fn send_error(error: ChannelError) -> LoginError {
    match error {
        ChannelError::Closed => LoginError::TransportClosed,
        other => LoginError::Channel(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::{ScriptedTerminal, Sent};

    fn shell() -> MarkerSet {
        MarkerSet::from(["#", ">", "$"])
    }

    fn ready() -> MarkerSet {
        MarkerSet::from(">>>")
    }

    fn creds() -> Credentials {
        Credentials::new("admin").with_password("s3cret")
    }

    async fn run_login(terminal: &mut ScriptedTerminal, policy: &LoginPolicy) -> Result<Ready, LoginError> {
        login(terminal, &creds(), &shell(), "python3", &ready(), policy).await
    }

    #[test]
    fn test_from_index() {
        assert_eq!(LoginPrompt::from_index(0), LoginPrompt::HostKeyPrompt);
        assert_eq!(LoginPrompt::from_index(1), LoginPrompt::PasswordPrompt);
        assert_eq!(LoginPrompt::from_index(2), LoginPrompt::ShellReady(0));
        assert_eq!(LoginPrompt::from_index(4), LoginPrompt::ShellReady(2));
    }

    #[test]
    fn test_candidates_order() {
        let candidates = LoginPrompt::candidates(&shell());
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates.get(0).unwrap().as_str(), HOST_KEY_PROMPT);
        assert_eq!(candidates.get(1).unwrap().as_str(), PASSWORD_PROMPT);
        assert_eq!(candidates.get(2).unwrap().as_str(), "#");
    }

    #[tokio::test]
    async fn test_direct_shell() {
        let mut term = ScriptedTerminal::new()
            .output("Welcome\r\nuser@host:~$ ")
            .output("python3\r\nPython 3.12.3\r\n>>> ");
        let log = term.transcript();

        let ready = run_login(&mut term, &LoginPolicy::default()).await.unwrap();
        assert_eq!(ready.prompt, ">>>");
        assert_eq!(ready.rounds, 1);
        assert_eq!(log.lock().unwrap().lines(), vec!["python3"]);
    }

    #[tokio::test]
    async fn test_host_key_then_password() {
        let mut term = ScriptedTerminal::new()
            .output("The authenticity of host 'x' can't be established.\r\nAre you sure you want to continue connecting (yes/no)? ")
            .output("yes\r\nadmin@x's password: ")
            .output("\r\nLast login: today\r\nadmin@x:~$ ")
            .output(">>> ");
        let log = term.transcript();

        let ready = run_login(&mut term, &LoginPolicy::default()).await.unwrap();
        assert_eq!(ready.rounds, 3);
        assert_eq!(ready.passwords_sent, 1);
        let log = log.lock().unwrap();
        assert_eq!(log.lines(), vec!["yes", "s3cret", "python3"]);
        // The echo wait precedes the password.
        assert_eq!(log.sent[1], Sent::NoEchoWait);
    }

    #[tokio::test]
    async fn test_password_reprompt_sends_password_twice() {
        let mut term = ScriptedTerminal::new()
            .output("Password: ")
            .output("\r\nPermission denied, please try again.\r\nPassword: ")
            .output("\r\nuser@host:~$ ")
            .output(">>> ");
        let log = term.transcript();

        let ready = run_login(&mut term, &LoginPolicy::default()).await.unwrap();
        assert_eq!(ready.passwords_sent, 2);
        assert_eq!(log.lock().unwrap().lines(), vec!["s3cret", "s3cret", "python3"]);
    }

    #[tokio::test]
    async fn test_password_attempts_are_bounded() {
        let policy = LoginPolicy {
            max_password_attempts: 2,
            ..Default::default()
        };
        let mut term = ScriptedTerminal::new()
            .output("Password: ")
            .output("Password: ")
            .output("Password: ");
        let log = term.transcript();

        let err = run_login(&mut term, &policy).await.unwrap_err();
        assert!(matches!(err, LoginError::AuthRejected { ref user, .. } if user == "admin"));
        assert_eq!(log.lock().unwrap().lines(), vec!["s3cret", "s3cret"]);
    }

    #[tokio::test]
    async fn test_password_prompt_without_password() {
        let mut term = ScriptedTerminal::new().output("Password: ");
        let err = login(
            &mut term,
            &Credentials::new("admin"),
            &shell(),
            "python3",
            &ready(),
            &LoginPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LoginError::AuthRejected { .. }));
    }

    #[tokio::test]
    async fn test_rounds_are_bounded() {
        let policy = LoginPolicy {
            max_rounds: 3,
            ..Default::default()
        };
        let mut term = ScriptedTerminal::new()
            .output("Are you sure you want to continue connecting? ")
            .output("Are you sure you want to continue connecting? ")
            .output("Are you sure you want to continue connecting? ")
            .output("user@host:~$ ");

        let err = run_login(&mut term, &policy).await.unwrap_err();
        assert!(matches!(err, LoginError::RetriesExhausted { rounds: 3 }));
    }

    #[tokio::test]
    async fn test_shell_timeout() {
        let mut term = ScriptedTerminal::new().output("motd without a prompt\r\n");
        let err = run_login(&mut term, &LoginPolicy::default()).await.unwrap_err();
        assert!(matches!(
            err,
            LoginError::Timeout {
                stage: LoginStage::Shell,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_interpreter_timeout() {
        let mut term = ScriptedTerminal::new()
            .output("user@host:~$ ")
            .output("bash: python3: command not found\r\n");
        let err = run_login(&mut term, &LoginPolicy::default()).await.unwrap_err();
        assert!(matches!(
            err,
            LoginError::Timeout {
                stage: LoginStage::Interpreter,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_hangup_during_login() {
        let mut term = ScriptedTerminal::new().hangup();
        let err = run_login(&mut term, &LoginPolicy::default()).await.unwrap_err();
        assert!(matches!(err, LoginError::TransportClosed));
    }

    #[test]
    fn test_policy_serde_defaults() {
        let policy: LoginPolicy = serde_json::from_str(r#"{"max_rounds": 4}"#).unwrap();
        assert_eq!(policy.max_rounds, 4);
        assert_eq!(policy.max_password_attempts, 3);
        assert_eq!(policy.prompt_timeout, Duration::from_secs(10));
    }
}
