//! Command batch execution.

use std::time::Instant;

use log::{debug, warn};

use super::batch::CommandBatch;
use super::options::ResolvedOptions;
use super::response::ExecutionResult;
use crate::channel::Terminal;
use crate::error::{ChannelError, ExecutionError};

/// Run every command of `batch` in order.
///
/// Each command is sent only after the previous one's ready marker was seen.
/// Error-marker matches are recorded per result and do not stop the batch; a
/// wait timeout or a closed stream does.
pub async fn run_batch<T: Terminal>(
    terminal: &mut T,
    batch: &CommandBatch,
    options: &ResolvedOptions,
) -> Result<Vec<ExecutionResult>, ExecutionError> {
    let mut results = Vec::with_capacity(batch.len());
    for (index, command) in batch.iter().enumerate() {
        results.push(execute(terminal, index, command, options).await?);
    }
    Ok(results)
}

async fn execute<T: Terminal>(
    terminal: &mut T,
    index: usize,
    command: &str,
    options: &ResolvedOptions,
) -> Result<ExecutionResult, ExecutionError> {
    let start = Instant::now();
    debug!("run #{}: {:?}", index, command);

    terminal.send_line(command).await.map_err(|e| match e {
        ChannelError::Closed => ExecutionError::TransportClosed,
        other => ExecutionError::Channel(other),
    })?;

    let m = terminal
        .expect(&options.marker, options.timeout)
        .await
        .map_err(|e| match e {
            ChannelError::PatternTimeout(after) => {
                warn!("command #{} {:?} timed out after {:?}", index, command, after);
                ExecutionError::Timeout {
                    command: command.to_string(),
                    index,
                    after,
                }
            }
            ChannelError::Closed => ExecutionError::TransportClosed,
            other => ExecutionError::Channel(other),
        })?;

    let elapsed = start.elapsed();
    let echo_free = strip_echo(&m.before, command);
    let output = if options.strip_cmds {
        normalize_newlines(echo_free)
    } else {
        normalize_newlines(&m.before)
    };

    let error_match = options
        .error_marker
        .as_ref()
        .and_then(|marker| marker.find_str(echo_free));

    match error_match {
        Some(matched) => {
            debug!("run #{}: error marker {:?} matched", index, matched);
            Ok(ExecutionResult::failure(
                command, output, m.before.as_str(), m.matched, elapsed, matched,
            ))
        }
        None => Ok(ExecutionResult::success(
            command,
            output,
            m.before.as_str(),
            m.matched,
            elapsed,
        )),
    }
}

/// Remove the echoed command from the start of a captured window.
///
/// Leading blanks left over from the previous prompt are skipped, then one
/// copy of `command` and one line terminator are removed. The window is
/// returned unchanged if it does not start with the echo.
pub fn strip_echo<'a>(window: &'a str, command: &str) -> &'a str {
    const BLANK: [char; 2] = [' ', '\t'];
    let Some(rest) = window
        .trim_start_matches(BLANK)
        .strip_prefix(command.trim_start_matches(BLANK))
    else {
        return window;
    };
    rest.strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .or_else(|| rest.strip_prefix('\r'))
        .unwrap_or(rest)
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::channel::mock::ScriptedTerminal;
    use crate::channel::{Marker, MarkerSet};

    fn options(strip_cmds: bool) -> ResolvedOptions {
        ResolvedOptions {
            marker: MarkerSet::from(">>>"),
            error_marker: Some(Marker::literal("Error")),
            strip_cmds,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_strip_echo() {
        assert_eq!(strip_echo("2+2\n4\n", "2+2"), "4\n");
        assert_eq!(strip_echo(" 2+2\r\n4\r\n", "2+2"), "4\r\n");
        assert_eq!(strip_echo("x = 1\r\n", "x = 1"), "");
        assert_eq!(strip_echo("     print(i)\r\n0\r\n", "    print(i)"), "0\r\n");
        assert_eq!(strip_echo(" \r\n", ""), "");
        // Echo missing: leave the window alone
        assert_eq!(strip_echo("4\n", "2+2"), "4\n");
    }

    #[tokio::test]
    async fn test_strip_cmds_example() {
        let mut term = ScriptedTerminal::new().output("2+2\n4\n>>> ");
        let results = run_batch(&mut term, &CommandBatch::from("2+2"), &options(true))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "4\n");
        assert_eq!(results[0].raw_output, "2+2\n4\n");
        assert_eq!(results[0].prompt, ">>>");
        assert!(results[0].is_success());
    }

    #[tokio::test]
    async fn test_without_strip_keeps_echo() {
        let mut term = ScriptedTerminal::new().output("2+2\r\n4\r\n>>> ");
        let results = run_batch(&mut term, &CommandBatch::from("2+2"), &options(false))
            .await
            .unwrap();
        assert_eq!(results[0].output, "2+2\n4\n");
    }

    #[tokio::test]
    async fn test_batch_order_all_successful() {
        let mut term = ScriptedTerminal::new()
            .output("a = 1\r\n>>> ")
            .output("b = 2\r\n>>> ")
            .output("a + b\r\n3\r\n>>> ");
        let log = term.transcript();

        let batch = CommandBatch::from("a = 1\nb = 2\na + b");
        let results = run_batch(&mut term, &batch, &options(true)).await.unwrap();

        assert_eq!(results.len(), 3);
        let commands: Vec<&str> = results.iter().map(|r| r.command.as_str()).collect();
        assert_eq!(commands, vec!["a = 1", "b = 2", "a + b"]);
        assert!(results.iter().all(|r| r.is_success()));
        assert_eq!(results[2].output, "3\n");
        assert_eq!(log.lock().unwrap().lines(), vec!["a = 1", "b = 2", "a + b"]);
    }

    #[tokio::test]
    async fn test_error_marker_does_not_abort_batch() {
        let mut term = ScriptedTerminal::new()
            .output("1/0\r\nTraceback (most recent call last):\r\nZeroDivisionError: division by zero\r\n>>> ")
            .output("print('ok')\r\nok\r\n>>> ");

        let batch = CommandBatch::from(["1/0", "print('ok')"]);
        let results = run_batch(&mut term, &batch, &options(true)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].failed);
        assert_eq!(results[0].error_match.as_deref(), Some("Error"));
        assert!(results[1].is_success());
        assert_eq!(results[1].output, "ok\n");
    }

    #[tokio::test]
    async fn test_echo_is_not_classified() {
        // The command text contains the error marker; its output does not.
        let mut term = ScriptedTerminal::new().output("msg = 'Error'\r\n>>> ");
        let results = run_batch(&mut term, &CommandBatch::from("msg = 'Error'"), &options(false))
            .await
            .unwrap();
        assert!(results[0].is_success());
    }

    #[tokio::test]
    async fn test_timeout_is_fatal_and_stops_batch() {
        let mut term = ScriptedTerminal::new()
            .output("a = 1\r\n>>> ")
            .output("while True: pass\r\n")
            .output("b = 2\r\n>>> ");
        let log = term.transcript();

        let batch = CommandBatch::from(["a = 1", "while True: pass", "b = 2"]);
        let err = run_batch(&mut term, &batch, &options(true)).await.unwrap_err();

        assert!(matches!(
            err,
            ExecutionError::Timeout { index: 1, ref command, .. } if command == "while True: pass"
        ));
        assert_eq!(log.lock().unwrap().lines(), vec!["a = 1", "while True: pass"]);
    }

    #[tokio::test]
    async fn test_hangup_is_transport_closed() {
        let mut term = ScriptedTerminal::new().hangup();
        let err = run_batch(&mut term, &CommandBatch::from("exit()"), &options(true))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::TransportClosed));
    }

    #[tokio::test]
    async fn test_disjunctive_ready_marker() {
        let opts = ResolvedOptions {
            marker: MarkerSet::from([">>>", "..."]),
            ..options(true)
        };
        let mut term = ScriptedTerminal::new()
            .output("for i in range(2):\r\n... ")
            .output("    print(i)\r\n... ")
            .output("\r\n0\r\n1\r\n>>> ");

        let batch = CommandBatch::from("for i in range(2):\n    print(i)\n\n");
        let results = run_batch(&mut term, &batch, &opts).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].prompt, "...");
        assert_eq!(results[1].prompt, "...");
        assert_eq!(results[2].command, "");
        assert_eq!(results[2].prompt, ">>>");
        assert_eq!(results[2].output, "0\n1\n");
    }
}
