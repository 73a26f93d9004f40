use crate::job::{JobId, SourceType};

/// Lifecycle events emitted by the engine and sweepers for monitoring/logging.
#[derive(Debug, Clone)]
pub enum JobEvent<'a> {
    Submitted {
        job_id: &'a JobId,
        source: SourceType,
        total: usize,
    },
    Started {
        job_id: &'a JobId,
    },
    ItemStarted {
        job_id: &'a JobId,
        /// 1-based position in the submission.
        position: usize,
        url: &'a str,
    },
    ItemSucceeded {
        job_id: &'a JobId,
        position: usize,
        files: &'a [String],
    },
    ItemFailed {
        job_id: &'a JobId,
        position: usize,
        error: &'a str,
    },
    Completed {
        job_id: &'a JobId,
        files: usize,
        errors: usize,
    },
    Failed {
        job_id: &'a JobId,
        error: &'a str,
    },
    PurgeScheduled {
        job_id: &'a JobId,
        files: usize,
    },
    Purged {
        job_id: &'a JobId,
        files_removed: usize,
    },
    StaleEvicted {
        count: usize,
    },
}

/// Trait for receiving job events (decoupled logging).
pub trait JobReporter: Send + Sync + 'static {
    fn report(&self, event: JobEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingJobReporter;

impl JobReporter for TracingJobReporter {
    fn report(&self, event: JobEvent<'_>) {
        match event {
            JobEvent::Submitted {
                job_id,
                source,
                total,
            } => {
                tracing::info!(%job_id, %source, %total, "Job submitted");
            }
            JobEvent::Started { job_id } => {
                tracing::info!(%job_id, "Job started");
            }
            JobEvent::ItemStarted {
                job_id,
                position,
                url,
            } => {
                tracing::debug!(%job_id, %position, %url, "Converting link");
            }
            JobEvent::ItemSucceeded {
                job_id,
                position,
                files,
            } => {
                tracing::debug!(%job_id, %position, ?files, "Link converted");
            }
            JobEvent::ItemFailed {
                job_id,
                position,
                error,
            } => {
                tracing::warn!(%job_id, %position, %error, "Link failed");
            }
            JobEvent::Completed {
                job_id,
                files,
                errors,
            } => {
                tracing::info!(%job_id, %files, %errors, "Job completed");
            }
            JobEvent::Failed { job_id, error } => {
                tracing::warn!(%job_id, %error, "Job failed");
            }
            JobEvent::PurgeScheduled { job_id, files } => {
                tracing::debug!(%job_id, %files, "Artifact purge scheduled");
            }
            JobEvent::Purged {
                job_id,
                files_removed,
            } => {
                tracing::info!(%job_id, %files_removed, "Job purged");
            }
            JobEvent::StaleEvicted { count } => {
                tracing::info!(%count, "Evicted stale failed jobs");
            }
        }
    }
}
