//! Runs the extractor for one URL and turns the result into job state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::command::{AUDIO_EXTENSION, CommandBuilder};
use crate::error::AppError;
use crate::events::{JobEvent, JobReporter};
use crate::job::{Browser, JobId, JobStatus, SourceType};
use crate::store::JobStore;
use crate::sweeper::RetentionHandle;
use crate::traits::{ProcessOutcome, ProcessRunner};
use crate::util::truncate_chars;

/// Longest error message stored on a single-URL job.
pub const JOB_ERROR_LIMIT: usize = 500;

/// Executes extractor runs and records their outcome in the [`JobStore`].
pub struct ConversionEngine<P: ProcessRunner> {
    runner: P,
    commands: CommandBuilder,
    timeout: Duration,
    pub(crate) store: JobStore,
    pub(crate) retention: RetentionHandle,
    pub(crate) reporter: Arc<dyn JobReporter>,
}

impl<P: ProcessRunner> ConversionEngine<P> {
    pub fn new(
        runner: P,
        commands: CommandBuilder,
        timeout: Duration,
        store: JobStore,
        retention: RetentionHandle,
        reporter: Arc<dyn JobReporter>,
    ) -> Self {
        Self {
            runner,
            commands,
            timeout,
            store,
            retention,
            reporter,
        }
    }

    /// Run the extractor once under `prefix` and return the artifacts it produced.
    ///
    /// - nonzero exit: [`AppError::ProcessFailed`] carrying stderr (or stdout)
    /// - timeout: [`AppError::Timeout`]
    /// - clean exit but no matching file: [`AppError::NoArtifacts`]
    pub async fn extract(
        &self,
        prefix: &str,
        url: &str,
        source: SourceType,
        browser: Option<Browser>,
    ) -> Result<Vec<String>, AppError> {
        let command = self.commands.build(prefix, url, source, browser);
        tracing::debug!(%prefix, %command, "Running extractor");

        match self.runner.run(&command, self.timeout).await? {
            ProcessOutcome::Exited { success: true, .. } => {
                let files = scan_artifacts(self.commands.output_dir(), prefix).await?;
                if files.is_empty() {
                    Err(AppError::NoArtifacts)
                } else {
                    Ok(files)
                }
            }
            ProcessOutcome::Exited {
                success: false,
                stdout,
                stderr,
            } => {
                let output = if !stderr.trim().is_empty() {
                    stderr
                } else if !stdout.trim().is_empty() {
                    stdout
                } else {
                    "Unknown error occurred".to_string()
                };
                Err(AppError::ProcessFailed(output))
            }
            ProcessOutcome::TimedOut => Err(AppError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Drive a single-URL job from `queued` to a terminal state.
    pub async fn run_single(
        &self,
        job_id: &JobId,
        url: &str,
        source: SourceType,
        browser: Option<Browser>,
    ) -> Result<JobStatus, AppError> {
        self.store.update(job_id, |job| job.start())?;
        self.reporter.report(JobEvent::Started { job_id });
        self.reporter.report(JobEvent::ItemStarted {
            job_id,
            position: 1,
            url,
        });

        match self.extract(job_id.as_str(), url, source, browser).await {
            Ok(files) => {
                self.store.update(job_id, |job| {
                    job.advance(1);
                    job.complete(files.clone())
                })?;
                self.reporter.report(JobEvent::ItemSucceeded {
                    job_id,
                    position: 1,
                    files: &files,
                });
                self.reporter.report(JobEvent::Completed {
                    job_id,
                    files: files.len(),
                    errors: 0,
                });
                self.schedule_purge(job_id, files);
                Ok(JobStatus::Complete)
            }
            Err(e) => {
                let message = truncate_chars(&e.to_string(), JOB_ERROR_LIMIT);
                self.store.update(job_id, |job| {
                    job.advance(1);
                    job.fail(message.clone())
                })?;
                self.reporter.report(JobEvent::Failed {
                    job_id,
                    error: &message,
                });
                Ok(JobStatus::Error)
            }
        }
    }

    pub(crate) fn schedule_purge(&self, job_id: &JobId, files: Vec<String>) {
        let count = files.len();
        if !self.retention.schedule(job_id.clone(), files) {
            tracing::warn!(%job_id, %count, "Retention sweeper not running; artifacts will not expire");
        }
    }
}

/// Names of the artifacts in `dir` written under `prefix`, sorted.
///
/// A file belongs to `prefix` when its name is `<prefix>_<anything>.mp3`; the
/// separator keeps `job_1` from matching `job_10_*`.
pub async fn scan_artifacts(dir: &Path, prefix: &str) -> Result<Vec<String>, AppError> {
    let stem = format!("{prefix}_");
    let suffix = format!(".{AUDIO_EXTENSION}");

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with(&stem) && name.ends_with(&suffix) && entry.file_type().await?.is_file() {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}
