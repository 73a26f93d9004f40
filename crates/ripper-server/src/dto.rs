use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ripper_core::JobRecord;

// ---------------------------------------------------------------------------
// Convert
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ConvertRequestBody {
    /// Single link (ignored when `urls` is non-empty)
    pub url: Option<String>,
    /// Up to 20 links converted as one batch
    pub urls: Option<Vec<String>>,
    /// `youtube` (default) or `soundcloud`
    pub source: Option<String>,
    /// Browser to read cookies from; unsupported values are ignored
    pub browser: Option<String>,
}

impl ConvertRequestBody {
    /// `urls` if it has any entries, otherwise the single `url`.
    pub fn into_urls(self) -> Vec<String> {
        match self.urls {
            Some(urls) if !urls.is_empty() => urls,
            _ => self.url.into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ConvertResponse {
    pub job_id: String,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    pub job_id: String,
    /// queued | downloading | complete | error
    pub status: String,
    pub files: Vec<String>,
    pub error: Option<String>,
    pub errors: Vec<String>,
    pub total: usize,
    pub completed_count: usize,
    pub status_detail: String,
    pub created: DateTime<Utc>,
}

impl From<JobRecord> for StatusResponse {
    fn from(job: JobRecord) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status.to_string(),
            files: job.files,
            error: job.error,
            errors: job.errors,
            total: job.total,
            completed_count: job.completed_count,
            status_detail: job.status_detail,
            created: job.created,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Jobs currently tracked in memory
    pub jobs: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Machine-readable category
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> ConvertRequestBody {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_urls_take_precedence() {
        let b = body(serde_json::json!({"url": "a", "urls": ["b", "c"]}));
        assert_eq!(b.into_urls(), vec!["b", "c"]);
    }

    #[test]
    fn test_falls_back_to_single_url() {
        let b = body(serde_json::json!({"url": "a", "urls": []}));
        assert_eq!(b.into_urls(), vec!["a"]);
        let b = body(serde_json::json!({"source": "youtube"}));
        assert!(b.into_urls().is_empty());
    }
}
