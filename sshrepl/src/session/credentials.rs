//! Login credentials.

use secrecy::SecretString;

/// The principal and optional secret used during login.
///
/// The password answers in-band password prompts. It is never logged and is
/// redacted from `Debug` output.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }
}
