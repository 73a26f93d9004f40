//! Multi-URL submissions: items run one after another under per-item prefixes
//! and their outcomes are merged into the batch record.

use crate::engine::ConversionEngine;
use crate::error::AppError;
use crate::events::JobEvent;
use crate::job::{Browser, JobId, JobStatus, SourceType};
use crate::traits::ProcessRunner;
use crate::util::truncate_chars;

/// Longest per-item error message kept on a batch.
pub const ITEM_ERROR_LIMIT: usize = 200;

/// `"Link <position>: <message>"` with the message truncated.
pub fn label_item_error(position: usize, message: &str) -> String {
    format!("Link {position}: {}", truncate_chars(message, ITEM_ERROR_LIMIT))
}

impl<P: ProcessRunner> ConversionEngine<P> {
    /// Drive a batch job from `queued` to a terminal state.
    ///
    /// Items run strictly in submission order. Any artifact at all makes the
    /// batch `complete`; per-item failures are kept alongside in `errors`.
    pub async fn run_batch(
        &self,
        job_id: &JobId,
        urls: &[String],
        source: SourceType,
        browser: Option<Browser>,
    ) -> Result<JobStatus, AppError> {
        let total = urls.len();
        self.store.update(job_id, |job| {
            job.total = total;
            job.start()
        })?;
        self.reporter.report(JobEvent::Started { job_id });

        for (index, url) in urls.iter().enumerate() {
            let position = index + 1;
            let prefix = job_id.item_prefix(index);
            self.reporter.report(JobEvent::ItemStarted {
                job_id,
                position,
                url,
            });

            match self.extract(&prefix, url, source, browser).await {
                Ok(files) => {
                    self.store.update(job_id, |job| {
                        job.record_files(files.clone())?;
                        job.advance(position);
                        Ok(())
                    })?;
                    self.reporter.report(JobEvent::ItemSucceeded {
                        job_id,
                        position,
                        files: &files,
                    });
                }
                Err(e) => {
                    let labeled = label_item_error(position, &e.to_string());
                    self.store.update(job_id, |job| {
                        job.record_item_error(labeled.clone());
                        job.advance(position);
                        Ok(())
                    })?;
                    self.reporter.report(JobEvent::ItemFailed {
                        job_id,
                        position,
                        error: &labeled,
                    });
                }
            }
        }

        let settled = self.store.update(job_id, |job| {
            let status = job.settle()?;
            Ok((status, job.files.clone(), job.errors.len(), job.error.clone()))
        })?;

        match settled {
            (JobStatus::Complete, files, errors, _) => {
                self.reporter.report(JobEvent::Completed {
                    job_id,
                    files: files.len(),
                    errors,
                });
                self.schedule_purge(job_id, files);
                Ok(JobStatus::Complete)
            }
            (status, _, _, error) => {
                self.reporter.report(JobEvent::Failed {
                    job_id,
                    error: error.as_deref().unwrap_or_default(),
                });
                Ok(status)
            }
        }
    }
}
