//! The expect-style interface the negotiators and executor are written against.

use std::future::Future;
use std::time::Duration;

use super::marker::MarkerSet;
use crate::error::{ChannelError, TransportError};

/// Outcome of a successful [`Terminal::expect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Index of the matched marker in the set passed to `expect`.
    pub index: usize,

    /// Text received before the match.
    pub before: String,

    /// The matched text itself.
    pub matched: String,
}

/// A line-oriented interactive stream with pattern waits.
///
/// Implementations own the transport and its read buffer. Callers hold
/// `&mut self` for the duration of each wait, so only one operation can be
/// in flight per terminal.
pub trait Terminal: Send {
    /// Wait until one of `markers` appears or `timeout` elapses.
    ///
    /// Returns [`ChannelError::PatternTimeout`] on timeout and
    /// [`ChannelError::Closed`] when the stream ends without a match.
    fn expect(
        &mut self,
        markers: &MarkerSet,
        timeout: Duration,
    ) -> impl Future<Output = Result<Match, ChannelError>> + Send;

    /// Send `line` followed by the line terminator.
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Send a control character, e.g. `'d'` for Ctrl-D.
    fn send_control(&mut self, control: char)
    -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Give the remote side time to turn echo off before hidden input.
    fn wait_no_echo(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Release the underlying transport.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Whether the stream is still open.
    fn is_open(&self) -> bool;
}

/// Map a control character name to its byte (`'c'` -> 0x03, `'d'` -> 0x04).
///
/// Accepts ASCII letters in either case and `@[\]^_`.
pub fn control_byte(control: char) -> Option<u8> {
    let upper = control.to_ascii_uppercase();
    match upper {
        'A'..='Z' | '@' | '[' | '\\' | ']' | '^' | '_' => Some(upper as u8 & 0x1f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_byte() {
        assert_eq!(control_byte('c'), Some(0x03));
        assert_eq!(control_byte('D'), Some(0x04));
        assert_eq!(control_byte('['), Some(0x1b));
        assert_eq!(control_byte('1'), None);
        assert_eq!(control_byte('é'), None);
    }
}
