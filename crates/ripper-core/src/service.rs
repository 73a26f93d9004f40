use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::command::CommandBuilder;
use crate::config::ConverterConfig;
use crate::engine::ConversionEngine;
use crate::error::AppError;
use crate::events::{JobEvent, JobReporter};
use crate::job::{Browser, ConvertRequest, JobId, JobRecord, JobStatus, SourceType};
use crate::store::JobStore;
use crate::sweeper::{RetentionHandle, RetentionSweeper};
use crate::traits::ProcessRunner;
use crate::validate::is_valid_source_url;

/// Message recorded on a job whose conversion task died unexpectedly.
const INTERNAL_FAILURE: &str = "Internal error while converting. Please try again.";

/// Entry point for submitting conversions and polling their state.
///
/// Conversions run on a [`TaskTracker`] so [`shutdown`](Self::shutdown) can
/// wait for them; each one runs inside its own task so a panic is confined to
/// its job, which is then recorded as failed.
pub struct ConvertService<P: ProcessRunner> {
    config: ConverterConfig,
    store: JobStore,
    engine: Arc<ConversionEngine<P>>,
    reporter: Arc<dyn JobReporter>,
    workers: TaskTracker,
    background: TaskTracker,
    cancel: CancellationToken,
}

impl<P: ProcessRunner> ConvertService<P> {
    /// Build the service and start the retention sweepers.
    ///
    /// Creates the output directory if needed. Must be called from within a
    /// Tokio runtime.
    pub fn new(
        config: ConverterConfig,
        runner: P,
        reporter: Arc<dyn JobReporter>,
    ) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.output_dir).map_err(|e| {
            AppError::ConfigError(format!(
                "Cannot create output directory {}: {e}",
                config.output_dir.display()
            ))
        })?;

        let store = JobStore::new();
        let background = TaskTracker::new();
        let cancel = CancellationToken::new();

        let retention = RetentionSweeper::new(
            store.clone(),
            &config.output_dir,
            config.retention.clone(),
            Arc::clone(&reporter),
        )
        .spawn(&background, cancel.clone());

        let engine = ConversionEngine::new(
            runner,
            CommandBuilder::new(&config.extractor_bin, &config.output_dir),
            config.process_timeout,
            store.clone(),
            retention,
            Arc::clone(&reporter),
        );

        tracing::info!(
            output_dir = %config.output_dir.display(),
            extractor = %config.extractor_bin,
            "Conversion service ready"
        );

        Ok(Self {
            config,
            store,
            engine: Arc::new(engine),
            reporter,
            workers: TaskTracker::new(),
            background,
            cancel,
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Validate raw submission input.
    ///
    /// Blank lines are dropped. Checks run in order: at least one URL, at most
    /// `max_urls`, a known source, every URL on that source's allow-list. An
    /// unsupported browser hint is cleared rather than rejected.
    pub fn prepare(
        &self,
        raw_urls: Vec<String>,
        source: &str,
        browser_hint: &str,
    ) -> Result<ConvertRequest, AppError> {
        let urls: Vec<String> = raw_urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();

        if urls.is_empty() {
            return Err(AppError::ValidationError(
                "Please provide at least one URL".to_string(),
            ));
        }
        if urls.len() > self.config.max_urls {
            return Err(AppError::ValidationError(format!(
                "Maximum {} links at a time",
                self.config.max_urls
            )));
        }

        let source: SourceType = source
            .parse()
            .map_err(|_| AppError::ValidationError("Invalid source type".to_string()))?;

        let invalid: Vec<usize> = urls
            .iter()
            .enumerate()
            .filter(|(_, url)| !is_valid_source_url(url, source))
            .map(|(i, _)| i + 1)
            .collect();
        if invalid.len() == urls.len() {
            return Err(AppError::ValidationError(format!(
                "Please provide valid {} URLs",
                source.label()
            )));
        }
        if !invalid.is_empty() {
            let lines: Vec<String> = invalid.iter().map(ToString::to_string).collect();
            return Err(AppError::ValidationError(format!(
                "Invalid {} URL(s) at line(s): {}",
                source.label(),
                lines.join(", ")
            )));
        }

        let browser = Browser::from_hint(browser_hint);
        if browser.is_none() && !browser_hint.trim().is_empty() {
            tracing::debug!(hint = %browser_hint, "Ignoring unsupported browser hint");
        }

        Ok(ConvertRequest::new(urls, source).with_browser(browser))
    }

    /// Register a job for `request` and start converting it in the background.
    /// Returns as soon as the job is queued.
    pub fn submit(&self, request: ConvertRequest) -> Result<JobId, AppError> {
        if self.workers.is_closed() || self.cancel.is_cancelled() {
            return Err(AppError::Generic("Service is shutting down".to_string()));
        }
        if request.urls.is_empty() || request.urls.len() > self.config.max_urls {
            return Err(AppError::ValidationError(format!(
                "Submit between 1 and {} links",
                self.config.max_urls
            )));
        }

        let job = self.store.create(request.urls.len());
        let job_id = job.id;
        self.reporter.report(JobEvent::Submitted {
            job_id: &job_id,
            source: request.source,
            total: request.urls.len(),
        });

        let engine = Arc::clone(&self.engine);
        let store = self.store.clone();
        let retention = self.engine.retention.clone();
        let id = job_id.clone();
        self.workers.spawn(async move {
            let work = {
                let id = id.clone();
                tokio::spawn(async move {
                    if request.is_batch() {
                        engine
                            .run_batch(&id, &request.urls, request.source, request.browser)
                            .await
                    } else {
                        engine
                            .run_single(&id, &request.urls[0], request.source, request.browser)
                            .await
                    }
                })
            };

            match work.await {
                Ok(Ok(status)) => {
                    tracing::debug!(job_id = %id, %status, "Conversion task finished");
                }
                Ok(Err(e)) => {
                    tracing::error!(job_id = %id, error = %e, "Conversion task failed");
                    expire_partial(&retention, &id, mark_failed(&store, &id));
                }
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "Conversion task panicked");
                    expire_partial(&retention, &id, mark_failed(&store, &id));
                }
            }
        });

        Ok(job_id)
    }

    /// Current snapshot of a job.
    pub fn status(&self, job_id: &JobId) -> Result<JobRecord, AppError> {
        self.store
            .get(job_id)
            .ok_or_else(|| AppError::JobNotFound(job_id.to_string()))
    }

    /// Absolute path of `filename` if it is one of the job's recorded artifacts.
    pub fn artifact_path(&self, job_id: &JobId, filename: &str) -> Result<PathBuf, AppError> {
        let not_found = || AppError::FileNotFound {
            job_id: job_id.to_string(),
            filename: filename.to_string(),
        };

        let mut components = Path::new(filename).components();
        let single_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_name || filename.contains('\\') {
            return Err(not_found());
        }
        let job = self.status(job_id)?;
        if !job.files.iter().any(|f| f == filename) {
            return Err(not_found());
        }
        Ok(self.config.output_dir.join(filename))
    }

    /// Stop accepting submissions, wait for running conversions, then stop
    /// the retention loops.
    pub async fn shutdown(&self) {
        self.workers.close();
        self.workers.wait().await;
        self.cancel.cancel();
        self.background.close();
        self.background.wait().await;
        tracing::info!(jobs = self.store.len(), "Conversion service stopped");
    }
}

/// Force a job whose task died into `error` so pollers still see an end state.
/// Returns the artifacts the job had recorded before it died.
fn mark_failed(store: &JobStore, job_id: &JobId) -> Vec<String> {
    let result = store.update(job_id, |job| {
        if job.status == JobStatus::Queued {
            job.start()?;
        }
        if !job.status.is_terminal() {
            job.fail(INTERNAL_FAILURE.to_string())?;
        }
        Ok(job.files.clone())
    });
    match result {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(%job_id, error = %e, "Could not record conversion failure");
            Vec::new()
        }
    }
}

/// Files written before a task died still go through the normal expiry.
fn expire_partial(retention: &RetentionHandle, job_id: &JobId, files: Vec<String>) {
    if files.is_empty() {
        return;
    }
    if !retention.schedule(job_id.clone(), files) {
        tracing::warn!(%job_id, "Retention sweeper not running; partial artifacts will not expire");
    }
}
