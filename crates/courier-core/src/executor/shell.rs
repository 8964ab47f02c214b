//! Shell command execution with a hard wall-clock deadline.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::warn;

use super::TaskExecutor;
use crate::domain::ExecutionOutcome;

/// Default hard deadline for one command.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(60);

const SHELL: &str = "sh";

/// After a kill, how long the pipe readers get to flush buffered output.
const READER_FLUSH: Duration = Duration::from_millis(100);

/// Runs a payload as `sh -c <payload>`: pipes, redirection and chaining all
/// work. stdout and stderr are merged into one transcript in the order the
/// reader observed them, and the whole run is bounded by a hard deadline.
///
/// Stateless between calls; concurrent executions each spawn their own child
/// process.
pub struct ShellExecutor {
    shell: String,
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: SHELL.to_string(),
            timeout: DEFAULT_EXEC_TIMEOUT,
        }
    }

    /// Override the hard deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the shell binary.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    async fn run(&self, payload: &str) -> std::io::Result<ExecutionOutcome> {
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr was not captured"))?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        let readers = [
            spawn_line_reader(stdout, line_tx.clone()),
            spawn_line_reader(stderr, line_tx),
        ];

        let deadline = Instant::now() + self.timeout;

        match time::timeout_at(deadline, child.wait()).await {
            Err(_) => {
                // Deadline hit with the child still running: kill and reap it
                // so nothing outlives this call, then report what was
                // captured.
                if let Err(err) = child.kill().await {
                    warn!(error = %err, "failed to kill timed-out child");
                }
                let _ = time::timeout(READER_FLUSH, join_readers(readers)).await;
                let output = drain_captured(&mut line_rx);
                Ok(ExecutionOutcome::failed(format!(
                    "Command timed out.\n{output}"
                )))
            }
            Ok(wait_result) => {
                let status = wait_result?;
                // Let the readers reach EOF so the transcript is complete; a
                // backgrounded grandchild can hold the pipe open, so bound
                // the wait by the same deadline.
                let _ = time::timeout_at(deadline, join_readers(readers)).await;
                let output = drain_captured(&mut line_rx);

                if status.success() {
                    Ok(ExecutionOutcome::success(output))
                } else {
                    // exit code is the single source of truth for
                    // classification; signal-killed children have no code
                    let code = status.code().unwrap_or(-1);
                    Ok(ExecutionOutcome::failed(format!(
                        "Command failed with exit code {code}.\n{output}"
                    )))
                }
            }
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExecutor for ShellExecutor {
    async fn execute(&self, payload: &str) -> ExecutionOutcome {
        match self.run(payload).await {
            Ok(outcome) => outcome,
            Err(err) => ExecutionOutcome::failed(format!("Error executing command: {err}")),
        }
    }
}

/// Forward lines from one child pipe into the shared channel.
///
/// stdout and stderr feed the same channel, so the transcript interleaves the
/// two streams in the order this side observed them.
fn spawn_line_reader<R>(pipe: R, line_tx: mpsc::UnboundedSender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    })
}

async fn join_readers(readers: [JoinHandle<()>; 2]) {
    for reader in readers {
        let _ = reader.await;
    }
}

/// Close the channel and take every line captured so far, newline-terminated.
fn drain_captured(line_rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    line_rx.close();
    let mut output = String::new();
    while let Ok(line) = line_rx.try_recv() {
        output.push_str(&line);
        output.push('\n');
    }
    output
}
