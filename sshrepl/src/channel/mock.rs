//! Scripted in-memory terminal for driving the negotiators in tests.
//!
//! Each `expect` call feeds the next scripted step into a real
//! [`PatternBuffer`] and then searches it, so matching behaves exactly like
//! the SSH channel. An exhausted script times out.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::buffer::PatternBuffer;
use super::marker::MarkerSet;
use super::terminal::{Match, Terminal, control_byte};
use crate::error::{ChannelError, TransportError};

#[derive(Debug, Clone)]
enum Step {
    Output(String),
    Closing(String),
    Silence,
    Hangup,
}

/// Everything the code under test sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Line(String),
    Control(char),
    NoEchoWait,
}

#[derive(Debug, Default)]
pub struct Transcript {
    pub sent: Vec<Sent>,
    pub expects: usize,
    pub closed: bool,
}

impl Transcript {
    /// Only the lines, in order.
    pub fn lines(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Line(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct ScriptedTerminal {
    script: VecDeque<Step>,
    buffer: PatternBuffer,
    open: bool,
    transcript: Arc<Mutex<Transcript>>,
}

impl ScriptedTerminal {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            buffer: PatternBuffer::new(1000, true),
            open: true,
            transcript: Arc::new(Mutex::new(Transcript::default())),
        }
    }

    /// Output delivered on the next `expect`.
    pub fn output(mut self, text: &str) -> Self {
        self.script.push_back(Step::Output(text.to_string()));
        self
    }

    /// Output delivered on the next `expect`, after which the remote end
    /// disconnects.
    pub fn closing(mut self, text: &str) -> Self {
        self.script.push_back(Step::Closing(text.to_string()));
        self
    }

    /// Nothing arrives on the next `expect`.
    pub fn silence(mut self) -> Self {
        self.script.push_back(Step::Silence);
        self
    }

    /// The remote end disconnects on the next `expect`.
    pub fn hangup(mut self) -> Self {
        self.script.push_back(Step::Hangup);
        self
    }

    /// Append another script's steps after this one's.
    pub fn then(mut self, other: ScriptedTerminal) -> Self {
        self.script.extend(other.script);
        self
    }

    /// Shared handle to the transcript, usable after the terminal is moved.
    pub fn transcript(&self) -> Arc<Mutex<Transcript>> {
        Arc::clone(&self.transcript)
    }

    fn record(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap()
    }
}

impl Terminal for ScriptedTerminal {
    async fn expect(
        &mut self,
        markers: &MarkerSet,
        timeout: Duration,
    ) -> Result<Match, ChannelError> {
        self.record().expects += 1;
        match self.script.pop_front() {
            Some(Step::Output(text)) => self.buffer.extend(text.as_bytes()),
            Some(Step::Closing(text)) => {
                self.buffer.extend(text.as_bytes());
                self.open = false;
            }
            Some(Step::Hangup) => self.open = false,
            Some(Step::Silence) | None => {}
        }

        if let Some(m) = self.buffer.find_first(markers) {
            let (before, matched) = self.buffer.take_match(&m);
            return Ok(Match {
                index: m.index,
                before,
                matched,
            });
        }

        if self.open {
            Err(ChannelError::PatternTimeout(timeout))
        } else {
            Err(ChannelError::Closed)
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        self.record().sent.push(Sent::Line(line.to_string()));
        Ok(())
    }

    async fn send_control(&mut self, control: char) -> Result<(), ChannelError> {
        control_byte(control).ok_or(ChannelError::InvalidControl(control))?;
        if !self.open {
            return Err(ChannelError::Closed);
        }
        self.record().sent.push(Sent::Control(control));
        Ok(())
    }

    async fn wait_no_echo(&mut self) -> Result<(), ChannelError> {
        self.record().sent.push(Sent::NoEchoWait);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        self.record().closed = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
