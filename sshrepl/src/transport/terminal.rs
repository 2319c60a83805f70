//! [`Terminal`] implementation over a real SSH connection.

use std::time::Duration;

use log::warn;

use super::config::SshConfig;
use super::ssh::SshTransport;
use crate::channel::{Match, MarkerSet, PtyChannel, PtyConfig, Terminal};
use crate::error::{ChannelError, Result, TransportError};

/// An SSH connection plus the interactive PTY channel running on it.
pub struct SshTerminal {
    /// `None` once closed.
    transport: Option<SshTransport>,
    channel: PtyChannel,
}

impl SshTerminal {
    /// Connect, authenticate, and open a PTY shell channel.
    pub async fn connect(config: SshConfig, pty: PtyConfig) -> Result<Self> {
        let transport = SshTransport::connect(config).await?;
        let channel = match transport.open_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    warn!("failed to disconnect after channel error: {}", close_err);
                }
                return Err(e);
            }
        };

        Ok(Self {
            transport: Some(transport),
            channel: PtyChannel::new(channel, pty),
        })
    }

    /// The underlying transport, if still connected.
    pub fn transport(&self) -> Option<&SshTransport> {
        self.transport.as_ref()
    }

    pub fn channel(&self) -> &PtyChannel {
        &self.channel
    }
}

impl Terminal for SshTerminal {
    async fn expect(
        &mut self,
        markers: &MarkerSet,
        timeout: Duration,
    ) -> std::result::Result<Match, ChannelError> {
        self.channel.read_until(markers, timeout).await
    }

    async fn send_line(&mut self, line: &str) -> std::result::Result<(), ChannelError> {
        self.channel.send_line(line).await
    }

    async fn send_control(&mut self, control: char) -> std::result::Result<(), ChannelError> {
        self.channel.send_control(control).await
    }

    async fn wait_no_echo(&mut self) -> std::result::Result<(), ChannelError> {
        self.channel.wait_no_echo().await;
        Ok(())
    }

    async fn close(&mut self) -> std::result::Result<(), TransportError> {
        // The channel may already be gone; the disconnect still has to happen.
        if let Err(e) = self.channel.close().await {
            warn!("failed to close channel cleanly: {}", e);
        }
        match self.transport.take() {
            Some(transport) => transport.close().await,
            None => Ok(()),
        }
    }

    fn is_open(&self) -> bool {
        self.channel.is_open() && self.transport.as_ref().is_some_and(SshTransport::is_alive)
    }
}
