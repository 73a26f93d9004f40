use std::future::Future;
use std::time::Duration;

use crate::command::ExtractorCommand;
use crate::error::AppError;

/// How an extractor run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited on its own.
    Exited {
        success: bool,
        stdout: String,
        stderr: String,
    },
    /// The wall-clock bound elapsed and the process was killed.
    TimedOut,
}

/// Runs an external extractor command to completion.
///
/// Errors are reserved for failing to launch the process at all; anything the
/// process itself does is reported through [`ProcessOutcome`].
pub trait ProcessRunner: Send + Sync + Clone + 'static {
    fn run(
        &self,
        command: &ExtractorCommand,
        timeout: Duration,
    ) -> impl Future<Output = Result<ProcessOutcome, AppError>> + Send;
}
