use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Status of a conversion job.
///
/// `Queued -> Downloading -> {Complete | Error}`; both terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// The full transition table. Anything not listed here is rejected.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Downloading)
                | (JobStatus::Downloading, JobStatus::Complete)
                | (JobStatus::Downloading, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "downloading" => Ok(JobStatus::Downloading),
            "complete" => Ok(JobStatus::Complete),
            "error" => Ok(JobStatus::Error),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Media source a submission targets. Drives both URL validation and
/// extractor flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Youtube,
    Soundcloud,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Youtube => "youtube",
            SourceType::Soundcloud => "soundcloud",
        }
    }

    /// Human-facing name used in validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Youtube => "YouTube",
            SourceType::Soundcloud => "SoundCloud",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "youtube" => Ok(SourceType::Youtube),
            "soundcloud" => Ok(SourceType::Soundcloud),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

/// Browsers the extractor can read authentication cookies from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
    Safari,
    Opera,
    Brave,
    Chromium,
    Vivaldi,
}

impl Browser {
    pub const ALL: [Browser; 8] = [
        Browser::Chrome,
        Browser::Firefox,
        Browser::Edge,
        Browser::Safari,
        Browser::Opera,
        Browser::Brave,
        Browser::Chromium,
        Browser::Vivaldi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
            Browser::Safari => "safari",
            Browser::Opera => "opera",
            Browser::Brave => "brave",
            Browser::Chromium => "chromium",
            Browser::Vivaldi => "vivaldi",
        }
    }

    /// Interpret a free-text browser hint. Blank or unsupported hints yield
    /// `None`: cookie sourcing is simply disabled, never an error.
    pub fn from_hint(hint: &str) -> Option<Browser> {
        let hint = hint.trim().to_lowercase();
        Browser::ALL.into_iter().find(|b| b.as_str() == hint)
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque short job identifier. Also used as the artifact filename prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    const LEN: usize = 12;

    /// A fresh random id: the first 12 hex digits of a v4 UUID.
    pub fn generate() -> Self {
        let mut raw = Uuid::new_v4().simple().to_string();
        raw.truncate(Self::LEN);
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix for the `index`-th (0-based) item of a batch.
    pub fn item_prefix(&self, index: usize) -> String {
        format!("{}_{}", self.0, index)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for JobId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// A validated submission, ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    pub urls: Vec<String>,
    pub source: SourceType,
    pub browser: Option<Browser>,
}

impl ConvertRequest {
    pub fn new(urls: Vec<String>, source: SourceType) -> Self {
        Self {
            urls,
            source,
            browser: None,
        }
    }

    pub fn with_browser(mut self, browser: Option<Browser>) -> Self {
        self.browser = browser;
        self
    }

    pub fn is_batch(&self) -> bool {
        self.urls.len() > 1
    }
}

/// One tracked submission (single URL or batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    /// Artifact filenames relative to the output directory, in completion order.
    pub files: Vec<String>,
    pub error: Option<String>,
    /// Per-item failures, batch only.
    pub errors: Vec<String>,
    pub created: DateTime<Utc>,
    pub total: usize,
    pub completed_count: usize,
    pub status_detail: String,
}

impl JobRecord {
    pub fn new(id: JobId, total: usize) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            files: Vec::new(),
            error: None,
            errors: Vec::new(),
            created: Utc::now(),
            total,
            completed_count: 0,
            status_detail: format!("Queued {total} link(s)..."),
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Enter `downloading`.
    pub fn start(&mut self) -> Result<(), AppError> {
        self.transition(JobStatus::Downloading)?;
        self.status_detail = format!("Downloading {} link(s)...", self.total);
        Ok(())
    }

    /// Append newly discovered artifacts, skipping names already recorded.
    /// Returns how many were actually added.
    pub fn record_files<I>(&mut self, files: I) -> Result<usize, AppError>
    where
        I: IntoIterator<Item = String>,
    {
        if self.status.is_terminal() {
            return Err(AppError::Generic(format!(
                "Job {} is {} and can no longer change its files",
                self.id, self.status
            )));
        }
        let mut added = 0;
        for file in files {
            if !self.files.contains(&file) {
                self.files.push(file);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn record_item_error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Record that `done` of `total` items have been processed.
    pub fn advance(&mut self, done: usize) {
        self.completed_count = done.min(self.total);
        self.status_detail = format!("Processing {} of {}...", self.completed_count, self.total);
    }

    /// Terminal success for a single-URL job.
    pub fn complete(&mut self, files: Vec<String>) -> Result<(), AppError> {
        self.record_files(files)?;
        if self.files.is_empty() {
            return Err(AppError::NoArtifacts);
        }
        self.transition(JobStatus::Complete)?;
        self.completed_count = self.total;
        self.status_detail = format!("Finished {} file(s)", self.files.len());
        Ok(())
    }

    /// Terminal failure with a user-facing message.
    pub fn fail(&mut self, message: String) -> Result<(), AppError> {
        self.transition(JobStatus::Error)?;
        self.error = Some(message);
        self.status_detail = "Failed".to_string();
        Ok(())
    }

    /// Resolve a batch once every item ran: any file at all means success,
    /// otherwise the joined per-item errors become the job error.
    pub fn settle(&mut self) -> Result<JobStatus, AppError> {
        if !self.files.is_empty() {
            self.transition(JobStatus::Complete)?;
            self.status_detail = format!(
                "Finished {} file(s) from {} link(s)",
                self.files.len(),
                self.total
            );
        } else if !self.errors.is_empty() {
            let joined = self.errors.join("\n");
            self.fail(joined)?;
        } else {
            self.fail("No MP3 files were created. The sources may not be supported.".to_string())?;
        }
        Ok(self.status)
    }

    /// True if this job failed and was created more than `window` before `now`.
    pub fn is_stale_error(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        self.status == JobStatus::Error && now - self.created > window
    }
}
