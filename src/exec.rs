//! Bounded subprocess execution.
//!
//! `CommandExecutor` runs one external control command per call with a
//! wall-clock timeout and normalizes every failure mode (spawn error,
//! nonzero exit, timeout) into a `CommandResult`. Nothing propagates past
//! this boundary; retry policy lives with the caller's circuit breaker.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::HardwareError;

/// Maximum stderr characters kept for diagnostics.
const STDERR_EXCERPT_LEN: usize = 200;

/// One external command invocation: program, argv, optional stdin bytes.
///
/// The EC-direct backend feeds register values through stdin (`dd` writes);
/// ectool commands carry everything in argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    /// Human-readable command line for logging.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// How a command invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// Nonzero exit, or spawn failure (`exit_code: None`).
    Failure { exit_code: Option<i32> },
    Timeout,
}

/// Normalized result of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub outcome: CommandOutcome,
    pub stdout: String,
    pub stderr_excerpt: String,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.outcome == CommandOutcome::Success
    }

    /// Map a non-success outcome to the domain error.
    pub fn to_error(&self) -> Option<HardwareError> {
        match self.outcome {
            CommandOutcome::Success => None,
            CommandOutcome::Failure { exit_code } => {
                Some(HardwareError::CommandFailed(exit_code))
            }
            CommandOutcome::Timeout => Some(HardwareError::Timeout),
        }
    }
}

/// Runs external control commands with a bounded timeout.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run one command to completion or timeout.
    ///
    /// On timeout the child is killed (`kill_on_drop`), so no orphan
    /// survives a hung control utility.
    pub async fn run(&self, spec: &CommandSpec) -> CommandResult {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(command = %spec.display(), error = %e, "spawn failed");
                return CommandResult {
                    outcome: CommandOutcome::Failure { exit_code: None },
                    stdout: String::new(),
                    stderr_excerpt: excerpt(&e.to_string()),
                };
            }
        };

        if let Some(bytes) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // A write error here surfaces as a nonzero exit below.
                let _ = stdin.write_all(bytes).await;
            }
        }

        match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                let outcome = if output.status.success() {
                    CommandOutcome::Success
                } else {
                    CommandOutcome::Failure {
                        exit_code: output.status.code(),
                    }
                };
                if outcome != CommandOutcome::Success {
                    warn!(
                        command = %spec.display(),
                        code = ?output.status.code(),
                        "command failed"
                    );
                }
                CommandResult {
                    outcome,
                    stdout,
                    stderr_excerpt: excerpt(&stderr),
                }
            }
            Ok(Err(e)) => CommandResult {
                outcome: CommandOutcome::Failure { exit_code: None },
                stdout: String::new(),
                stderr_excerpt: excerpt(&e.to_string()),
            },
            Err(_) => {
                // Dropping the wait future kills the child (kill_on_drop)
                // and tokio reaps it in the background.
                warn!(command = %spec.display(), timeout = ?self.timeout, "command timed out");
                CommandResult {
                    outcome: CommandOutcome::Timeout,
                    stdout: String::new(),
                    stderr_excerpt: String::new(),
                }
            }
        }
    }
}

fn excerpt(s: &str) -> String {
    let trimmed = s.trim_end();
    if trimmed.len() <= STDERR_EXCERPT_LEN {
        trimmed.to_string()
    } else {
        let mut end = STDERR_EXCERPT_LEN;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_display() {
        let spec = CommandSpec::new("ectool", &["rgbkbd", "0", "16711680"]);
        assert_eq!(spec.display(), "ectool rgbkbd 0 16711680");
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).len(), STDERR_EXCERPT_LEN);
        assert_eq!(excerpt("short\n"), "short");
    }

    #[test]
    fn test_result_to_error() {
        let ok = CommandResult {
            outcome: CommandOutcome::Success,
            stdout: String::new(),
            stderr_excerpt: String::new(),
        };
        assert_eq!(ok.to_error(), None);

        let failed = CommandResult {
            outcome: CommandOutcome::Failure { exit_code: Some(1) },
            ..ok.clone()
        };
        assert_eq!(failed.to_error(), Some(HardwareError::CommandFailed(Some(1))));

        let timed_out = CommandResult {
            outcome: CommandOutcome::Timeout,
            ..ok
        };
        assert_eq!(timed_out.to_error(), Some(HardwareError::Timeout));
    }

    #[tokio::test]
    async fn test_run_success_captures_stdout() {
        let exec = CommandExecutor::new(Duration::from_secs(2));
        let result = exec.run(&CommandSpec::new("echo", &["hello"])).await;
        assert!(result.is_success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let exec = CommandExecutor::new(Duration::from_secs(2));
        let result = exec.run(&CommandSpec::new("false", &[])).await;
        assert_eq!(
            result.outcome,
            CommandOutcome::Failure { exit_code: Some(1) }
        );
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let exec = CommandExecutor::new(Duration::from_secs(2));
        let result = exec
            .run(&CommandSpec::new("/nonexistent/ectool-missing", &["version"]))
            .await;
        assert_eq!(result.outcome, CommandOutcome::Failure { exit_code: None });
        assert!(!result.stderr_excerpt.is_empty());
    }

    #[tokio::test]
    async fn test_run_timeout_kills_child() {
        let exec = CommandExecutor::new(Duration::from_millis(100));
        let start = std::time::Instant::now();
        let result = exec.run(&CommandSpec::new("sleep", &["10"])).await;
        assert_eq!(result.outcome, CommandOutcome::Timeout);
        // Returned promptly rather than waiting out the sleep.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_run_with_stdin() {
        let exec = CommandExecutor::new(Duration::from_secs(2));
        let result = exec
            .run(&CommandSpec::new("cat", &[]).with_stdin(b"abc".to_vec()))
            .await;
        assert!(result.is_success());
        assert_eq!(result.stdout, "abc");
    }
}
