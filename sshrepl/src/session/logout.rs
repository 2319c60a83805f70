//! Logout negotiation: back out of the interpreter, then out of the shell.

use std::time::Duration;

use log::{debug, warn};

use crate::channel::{MarkerSet, Terminal};
use crate::error::{ChannelError, LogoutError};
use crate::interpreter::ExitStrategy;

/// Command that ends the enclosing login shell.
pub const SHELL_EXIT: &str = "exit";

/// Leave the interpreter and the login shell.
///
/// The shell `exit` is sent even when an earlier step failed, as long as the
/// stream is still open. A target that hangs up once the shell prompt was
/// seen is a clean teardown. The first error encountered is returned.
pub async fn logout<T: Terminal>(
    terminal: &mut T,
    strategy: &ExitStrategy,
    ready_marker: &MarkerSet,
    shell_markers: &MarkerSet,
    timeout: Duration,
) -> Result<(), LogoutError> {
    let left = leave_interpreter(terminal, strategy, ready_marker, shell_markers, timeout).await;
    if let Err(e) = &left {
        warn!("leaving interpreter failed: {}", e);
    }

    if !terminal.is_open() {
        if left.is_ok() {
            debug!("logout: target closed the stream after the shell prompt");
        }
        return left;
    }

    debug!("logout: sending '{}'", SHELL_EXIT);
    let exited = terminal.send_line(SHELL_EXIT).await.map_err(send_error);
    left.and(exited)
}

async fn leave_interpreter<T: Terminal>(
    terminal: &mut T,
    strategy: &ExitStrategy,
    ready_marker: &MarkerSet,
    shell_markers: &MarkerSet,
    timeout: Duration,
) -> Result<(), LogoutError> {
    match strategy {
        ExitStrategy::Graceful { command } => {
            // Flush any half-entered statement and see where we are.
            terminal.send_line("").await.map_err(send_error)?;
            let either = ready_marker.chain(shell_markers);
            let m = terminal
                .expect(&either, timeout)
                .await
                .map_err(|e| wait_error(e, "interpreter prompt"))?;

            if m.index >= ready_marker.len() {
                debug!("logout: interpreter already gone, at shell prompt {:?}", m.matched);
                return Ok(());
            }

            debug!("logout: sending '{}'", command);
            terminal.send_line(command).await.map_err(send_error)?;
        }
        ExitStrategy::Signal { control } => {
            debug!("logout: sending ctrl-{}", control);
            terminal.send_control(*control).await.map_err(send_error)?;
        }
    }

    terminal
        .expect(shell_markers, timeout)
        .await
        .map_err(|e| wait_error(e, "shell prompt"))?;
    Ok(())
}

fn wait_error(error: ChannelError, stage: &'static str) -> LogoutError {
    match error {
        ChannelError::PatternTimeout(after) => LogoutError::Timeout { stage, after },
        ChannelError::Closed => LogoutError::TransportClosed,
        other => LogoutError::Channel(other),
    }
}

fn send_error(error: ChannelError) -> LogoutError {
    match error {
        ChannelError::Closed => LogoutError::TransportClosed,
        other => LogoutError::Channel(other),
    }
}
