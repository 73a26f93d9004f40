use thiserror::Error;

use crate::job::JobStatus;

/// Application-wide error types for Ripper.
#[derive(Error, Debug)]
pub enum AppError {
    /// Submission rejected before any work was scheduled.
    #[error("{0}")]
    ValidationError(String),

    /// The extractor exited with a nonzero status.
    #[error("{0}")]
    ProcessFailed(String),

    /// The extractor exceeded its wall-clock budget and was killed.
    #[error("Download timed out after {}", describe_secs(.0))]
    Timeout(u64),

    /// The extractor exited cleanly but left no audio file behind.
    #[error("Download finished but no MP3 file was found. The source may not be supported.")]
    NoArtifacts,

    /// A job was asked to move backwards (or sideways) in its lifecycle.
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("File not found for job {job_id}: {filename}")]
    FileNotFound { job_id: String, filename: String },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Short machine-readable tag, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::ProcessFailed(_) => "process_failed",
            AppError::Timeout(_) => "timeout",
            AppError::NoArtifacts => "no_artifacts",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::JobNotFound(_) | AppError::FileNotFound { .. } => "not_found",
            AppError::ConfigError(_) => "config_error",
            AppError::Io(_) => "io_error",
            AppError::Generic(_) => "internal_error",
        }
    }
}

/// Render a duration in seconds the way users read it ("5 minutes", "90 seconds").
fn describe_secs(secs: &u64) -> String {
    match *secs {
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{s} seconds"),
    }
}
