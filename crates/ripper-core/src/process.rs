use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::command::ExtractorCommand;
use crate::error::AppError;
use crate::traits::{ProcessOutcome, ProcessRunner};

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// The child is spawned with `kill_on_drop`, so abandoning the wait on timeout
/// terminates it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        command: &ExtractorCommand,
        timeout: Duration,
    ) -> Result<ProcessOutcome, AppError> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::ProcessFailed(format!("Failed to start {}: {e}", command.program))
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessOutcome::Exited {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(AppError::Io(e)),
            Err(_) => {
                tracing::warn!(program = %command.program, ?timeout, "Extractor timed out, killing");
                Ok(ProcessOutcome::TimedOut)
            }
        }
    }
}
