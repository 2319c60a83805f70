//! russh client connection: host-key checking and authentication.
//!
//! Password logins fall back to keyboard-interactive when the server rejects
//! the plain `password` method, which is what PAM-backed servers usually do.
//! Every prompt in such an exchange that hides its input or asks for a
//! password is answered with the configured secret.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::Channel;
use russh::client::{self, Handle, KeyboardInteractiveAuthResponse, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::{ExposeSecret, SecretString};

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::{ChannelError, Result, TransportError};

/// Keyboard-interactive info requests answered before giving up.
const MAX_INTERACTIVE_ROUNDS: usize = 4;

/// Slot the host-key checker fills when it rejects a key, so `connect` can
/// report why instead of russh's generic error.
type Rejection = Arc<Mutex<Option<TransportError>>>;

/// An authenticated SSH connection.
pub struct SshTransport {
    session: Handle<HostKeyChecker>,
    config: SshConfig,
}

impl SshTransport {
    /// Connect, verify the host key and authenticate.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let client_config = Arc::new(client::Config {
            // Silence is normal while a command runs; each expect has its own bound.
            inactivity_timeout: None,
            ..Default::default()
        });

        let rejection = Rejection::default();
        let checker = HostKeyChecker {
            host: config.host.clone(),
            port: config.port,
            mode: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            rejection: Arc::clone(&rejection),
        };

        debug!("connecting to {}", config.socket_addr());
        let connecting = client::connect(client_config, (config.host.as_str(), config.port), checker);
        let mut session = tokio::time::timeout(config.timeout, connecting)
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))?
            .map_err(|e| {
                let rejected = rejection.lock().ok().and_then(|mut slot| slot.take());
                rejected.unwrap_or_else(|| connect_error(&config, e))
            })?;

        let accepted = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => {
                authenticate_password(&mut session, &config.username, password).await?
            }
            AuthMethod::PrivateKey { path, passphrase } => {
                authenticate_key(&mut session, &config.username, path, passphrase.as_ref()).await?
            }
        };

        if !accepted {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }
        debug!("authenticated as '{}'", config.username);

        Ok(Self { session, config })
    }

    /// Open a session channel with a PTY and start the login shell on it.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        let (width, height) = (self.config.terminal_width, self.config.terminal_height);
        if let Err(e) = channel.request_pty(true, "xterm", width, height, 0, 0, &[]).await {
            warn!("pty request failed: {}", e);
            return Err(ChannelError::PtyOpenFailed.into());
        }
        if let Err(e) = channel.request_shell(true).await {
            warn!("shell request failed: {}", e);
            return Err(ChannelError::ShellRequestFailed.into());
        }

        debug!("shell started on a {}x{} pty", width, height);
        Ok(channel)
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Whether russh's connection task is still running.
    pub fn is_alive(&self) -> bool {
        !self.session.is_closed()
    }

    /// Disconnect.
    pub async fn close(self) -> std::result::Result<(), TransportError> {
        debug!("disconnecting from {}", self.config.socket_addr());
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)
    }
}

fn connect_error(config: &SshConfig, error: russh::Error) -> TransportError {
    match error {
        russh::Error::IO(source) => TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        },
        other => TransportError::Ssh(other),
    }
}

async fn authenticate_password(
    session: &mut Handle<HostKeyChecker>,
    user: &str,
    password: &SecretString,
) -> std::result::Result<bool, TransportError> {
    let plain = session
        .authenticate_password(user, password.expose_secret())
        .await
        .map_err(TransportError::Ssh)?;
    if plain.success() {
        return Ok(true);
    }

    debug!("password method rejected for '{}', trying keyboard-interactive", user);
    let mut response = session
        .authenticate_keyboard_interactive_start(user, None::<String>)
        .await
        .map_err(TransportError::Ssh)?;

    for _ in 0..MAX_INTERACTIVE_ROUNDS {
        match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(true),
            KeyboardInteractiveAuthResponse::Failure { .. } => return Ok(false),
            KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                let answers = prompts
                    .iter()
                    .map(|p| {
                        if !p.echo || p.prompt.contains(crate::session::login::PASSWORD_PROMPT) {
                            password.expose_secret().to_string()
                        } else {
                            warn!("leaving keyboard-interactive prompt {:?} blank", p.prompt);
                            String::new()
                        }
                    })
                    .collect();
                response = session
                    .authenticate_keyboard_interactive_respond(answers)
                    .await
                    .map_err(TransportError::Ssh)?;
            }
        }
    }

    warn!("keyboard-interactive still prompting after {} rounds", MAX_INTERACTIVE_ROUNDS);
    Ok(false)
}

async fn authenticate_key(
    session: &mut Handle<HostKeyChecker>,
    user: &str,
    path: &Path,
    passphrase: Option<&SecretString>,
) -> std::result::Result<bool, TransportError> {
    let key = load_secret_key(path, passphrase.map(|p| p.expose_secret()))
        .map_err(|e| TransportError::Key(format!("{}: {}", path.display(), e)))?;

    // RSA keys need the strongest signature hash the server accepts.
    let hash_alg = session
        .best_supported_rsa_hash()
        .await
        .map_err(TransportError::Ssh)?
        .flatten();

    Ok(session
        .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
        .await
        .map_err(TransportError::Ssh)?
        .success())
}

/// russh client handler that applies the [`HostKeyVerification`] mode.
struct HostKeyChecker {
    host: String,
    port: u16,
    mode: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    rejection: Rejection,
}

impl HostKeyChecker {
    /// `Ok(true)` if known and matching, `Ok(false)` if unknown.
    fn lookup(&self, key: &PublicKey) -> std::result::Result<bool, TransportError> {
        let found = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };
        match found {
            Ok(known) => Ok(known),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn remember(&self, key: &PublicKey) {
        let saved = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        match saved {
            Ok(()) => debug!("learned host key for {}:{}", self.host, self.port),
            Err(e) => warn!("failed to save host key for {}: {}", self.host, e),
        }
    }

    fn reject(&self, error: TransportError) -> bool {
        warn!("rejecting host key: {}", error);
        if let Ok(mut slot) = self.rejection.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for HostKeyChecker {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if self.mode == HostKeyVerification::Disabled {
            return Ok(true);
        }

        let accepted = match (self.lookup(server_public_key), &self.mode) {
            (Ok(true), _) => true,
            (Ok(false), HostKeyVerification::AcceptNew) => {
                self.remember(server_public_key);
                true
            }
            (Ok(false), _) => self.reject(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            (Err(e), _) => self.reject(e),
        };
        Ok(accepted)
    }
}
