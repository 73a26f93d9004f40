//! Retention: delayed deletion of completed jobs and eviction of stale failures.
//!
//! Two independent background loops:
//! - the purge loop owns a min-heap of pending deletions keyed by due time, so
//!   one task serves every completed job instead of one sleeping task each;
//! - the stale loop periodically drops failed jobs older than the staleness
//!   window.
//!
//! Both stop when the shared [`CancellationToken`] fires.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::RetentionConfig;
use crate::events::{JobEvent, JobReporter};
use crate::job::JobId;
use crate::store::JobStore;

/// A completed job waiting for its files to expire.
#[derive(Debug)]
struct PendingPurge {
    due: Instant,
    seq: u64,
    job_id: JobId,
    files: Vec<String>,
}

impl PartialEq for PendingPurge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingPurge {}

impl PartialOrd for PendingPurge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingPurge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Handle used by the engine to schedule the delayed deletion of a job.
#[derive(Debug, Clone)]
pub struct RetentionHandle {
    tx: mpsc::UnboundedSender<(JobId, Vec<String>)>,
}

impl RetentionHandle {
    /// Delete exactly `files` and then the record of `job_id` once the
    /// completed-job TTL has elapsed.
    ///
    /// Returns false if the sweeper is no longer running.
    pub fn schedule(&self, job_id: JobId, files: Vec<String>) -> bool {
        self.tx.send((job_id, files)).is_ok()
    }
}

/// Owns the retention policy for one output directory and job store.
pub struct RetentionSweeper {
    store: JobStore,
    output_dir: PathBuf,
    config: RetentionConfig,
    reporter: Arc<dyn JobReporter>,
}

impl RetentionSweeper {
    pub fn new(
        store: JobStore,
        output_dir: impl Into<PathBuf>,
        config: RetentionConfig,
        reporter: Arc<dyn JobReporter>,
    ) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
            config,
            reporter,
        }
    }

    /// Start both loops on `tracker`. They run until `cancel` fires.
    pub fn spawn(self, tracker: &TaskTracker, cancel: CancellationToken) -> RetentionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let sweeper = Arc::new(self);

        tracker.spawn(Arc::clone(&sweeper).run_purge_loop(rx, cancel.clone()));
        tracker.spawn(sweeper.run_stale_loop(cancel));

        RetentionHandle { tx }
    }

    async fn run_purge_loop(
        self: Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<(JobId, Vec<String>)>,
        cancel: CancellationToken,
    ) {
        let mut pending: BinaryHeap<Reverse<PendingPurge>> = BinaryHeap::new();
        let mut seq = 0u64;
        let mut accepting = true;

        loop {
            if !accepting && pending.is_empty() {
                break;
            }
            let next_due = pending.peek().map(|Reverse(p)| p.due);

            tokio::select! {
                () = cancel.cancelled() => break,
                msg = rx.recv(), if accepting => match msg {
                    Some((job_id, files)) => {
                        self.reporter.report(JobEvent::PurgeScheduled {
                            job_id: &job_id,
                            files: files.len(),
                        });
                        seq += 1;
                        pending.push(Reverse(PendingPurge {
                            due: Instant::now() + self.config.completed_ttl,
                            seq,
                            job_id,
                            files,
                        }));
                    }
                    None => accepting = false,
                },
                () = sleep_until(next_due) => {
                    let now = Instant::now();
                    while pending.peek().is_some_and(|Reverse(p)| p.due <= now) {
                        if let Some(Reverse(due)) = pending.pop() {
                            self.purge_job(&due.job_id, &due.files).await;
                        }
                    }
                }
            }
        }

        if self.config.purge_on_shutdown {
            while let Ok((job_id, files)) = rx.try_recv() {
                self.purge_job(&job_id, &files).await;
            }
            for Reverse(p) in pending.into_vec() {
                self.purge_job(&p.job_id, &p.files).await;
            }
        }
        tracing::debug!("Purge loop stopped");
    }

    async fn run_stale_loop(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.config.sweep_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_stale();
                }
            }
        }
        tracing::debug!("Stale sweep loop stopped");
    }

    /// Best-effort removal of `files`, then of the job record. Delete
    /// failures are logged and otherwise ignored. Returns how many files
    /// were removed.
    pub async fn purge_job(&self, job_id: &JobId, files: &[String]) -> usize {
        let mut removed = 0;
        for file in files {
            let path = self.output_dir.join(file);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(%job_id, path = %path.display(), error = %e, "Could not delete artifact");
                }
            }
        }
        self.store.remove(job_id);
        self.reporter.report(JobEvent::Purged {
            job_id,
            files_removed: removed,
        });
        removed
    }

    /// One pass of the stale-error sweep. Returns the evicted ids.
    pub fn sweep_stale(&self) -> Vec<JobId> {
        let window = TimeDelta::from_std(self.config.stale_after).unwrap_or(TimeDelta::MAX);
        let evicted = self.store.remove_stale_errors(Utc::now(), window);
        if !evicted.is_empty() {
            self.reporter.report(JobEvent::StaleEvicted {
                count: evicted.len(),
            });
        }
        evicted
    }
}

async fn sleep_until(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}
