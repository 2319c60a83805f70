//! PTY channel over a russh session channel.

use std::time::Duration;

use log::{debug, trace};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::marker::MarkerSet;
use super::terminal::{Match, control_byte};
use crate::error::ChannelError;

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Overlap re-searched after a miss.
    pub search_depth: usize,

    /// Remove ANSI escape sequences from received output.
    pub strip_ansi: bool,

    /// Terminator appended by `send_line`.
    pub line_ending: String,

    /// Pause before sending hidden input.
    pub echo_settle: Duration,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            search_depth: 1000,
            strip_ansi: true,
            line_ending: "\n".to_string(),
            echo_settle: Duration::from_millis(100),
        }
    }
}

/// Interactive shell channel with a pattern buffer in front of it.
pub struct PtyChannel {
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    config: PtyConfig,
    is_open: bool,
}

impl PtyChannel {
    /// Wrap an already opened channel with PTY and shell granted.
    pub fn new(channel: Channel<Msg>, config: PtyConfig) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(config.search_depth, config.strip_ansi),
            config,
            is_open: true,
        }
    }

    /// Read until one of `markers` matches.
    pub async fn read_until(
        &mut self,
        markers: &MarkerSet,
        timeout: Duration,
    ) -> Result<Match, ChannelError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(m) = self.buffer.find_first(markers) {
                let (before, matched) = self.buffer.take_match(&m);
                trace!("matched marker #{} {:?}", m.index, matched);
                return Ok(Match {
                    index: m.index,
                    before,
                    matched,
                });
            }

            if !self.is_open {
                debug!(
                    "channel closed while waiting for {}; {} bytes unmatched",
                    markers,
                    self.buffer.len()
                );
                return Err(ChannelError::Closed);
            }

            match tokio::time::timeout_at(deadline, self.channel.wait()).await {
                Ok(Some(msg)) => self.handle_message(msg),
                Ok(None) => self.is_open = false,
                Err(_) => {
                    debug!(
                        "timed out after {:?} waiting for {}; tail: {:?}",
                        timeout,
                        markers,
                        tail(&self.buffer.as_str_lossy(), 80)
                    );
                    return Err(ChannelError::PatternTimeout(timeout));
                }
            }
        }
    }

    /// Collect whatever arrives during `period` without matching anything.
    pub async fn settle(&mut self, period: Duration) {
        let deadline = Instant::now() + period;
        while self.is_open {
            match tokio::time::timeout_at(deadline, self.channel.wait()).await {
                Ok(Some(msg)) => self.handle_message(msg),
                Ok(None) => self.is_open = false,
                Err(_) => break,
            }
        }
    }

    fn handle_message(&mut self, msg: ChannelMsg) {
        match msg {
            ChannelMsg::Data { ref data } => self.buffer.extend(data),
            ChannelMsg::ExtendedData { ref data, .. } => self.buffer.extend(data),
            ChannelMsg::Eof | ChannelMsg::Close => {
                debug!("remote closed the channel");
                self.is_open = false;
            }
            ChannelMsg::ExitStatus { exit_status } => {
                debug!("remote shell exited with status {exit_status}");
            }
            other => trace!("ignoring channel message {other:?}"),
        }
    }

    /// Send raw bytes.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        if !self.is_open {
            return Err(ChannelError::Closed);
        }
        self.channel.data(data).await.map_err(ChannelError::Ssh)
    }

    /// Send a line. The content is not logged since it may be a password.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        trace!("send_line: {} bytes", line.len());
        let mut data = Vec::with_capacity(line.len() + self.config.line_ending.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(self.config.line_ending.as_bytes());
        self.send_raw(&data).await
    }

    /// Send a control character.
    pub async fn send_control(&mut self, control: char) -> Result<(), ChannelError> {
        let byte = control_byte(control).ok_or(ChannelError::InvalidControl(control))?;
        debug!("send_control: ^{}", control.to_ascii_uppercase());
        self.send_raw(&[byte]).await
    }

    /// Pause for the configured echo settle time.
    pub async fn wait_no_echo(&mut self) {
        self.settle(self.config.echo_settle).await;
    }

    /// Send EOF and close the channel.
    pub async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;
        self.channel.eof().await.map_err(ChannelError::Ssh)?;
        self.channel.close().await.map_err(ChannelError::Ssh)
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn buffer(&self) -> &PatternBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &PtyConfig {
        &self.config
    }
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    match text.char_indices().nth(count.saturating_sub(max_chars)) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail() {
        assert_eq!(tail("hello world", 5), "world");
        assert_eq!(tail("hi", 5), "hi");
        assert_eq!(tail("", 5), "");
    }

    #[test]
    fn test_default_config() {
        let config = PtyConfig::default();
        assert_eq!(config.line_ending, "\n");
        assert!(config.strip_ansi);
        assert_eq!(config.search_depth, 1000);
    }
}
