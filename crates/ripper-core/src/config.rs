use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Timings for the retention sweepers.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// How long a completed job's files stay downloadable.
    pub completed_ttl: Duration,
    /// Period of the stale-error sweep.
    pub sweep_interval: Duration,
    /// Failed jobs older than this are evicted by the sweep.
    pub stale_after: Duration,
    /// Delete pending artifacts immediately when the service shuts down.
    pub purge_on_shutdown: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            completed_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(300),
            stale_after: Duration::from_secs(300),
            purge_on_shutdown: true,
        }
    }
}

impl RetentionConfig {
    pub fn with_completed_ttl(mut self, ttl: Duration) -> Self {
        self.completed_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_stale_after(mut self, window: Duration) -> Self {
        self.stale_after = window;
        self
    }

    pub fn with_purge_on_shutdown(mut self, purge: bool) -> Self {
        self.purge_on_shutdown = purge;
        self
    }
}

/// Configuration for the conversion service.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Shared directory every artifact is written to.
    pub output_dir: PathBuf,
    /// Extractor executable (looked up on `PATH` unless absolute).
    pub extractor_bin: String,
    /// Hard wall-clock bound for one extractor run.
    pub process_timeout: Duration,
    /// Upper bound on URLs per submission.
    pub max_urls: usize,
    pub retention: RetentionConfig,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("ripped_tunes"),
            extractor_bin: "yt-dlp".to_string(),
            process_timeout: Duration::from_secs(300),
            max_urls: 20,
            retention: RetentionConfig::default(),
        }
    }
}

impl ConverterConfig {
    /// Read configuration from environment variables, falling back to defaults.
    ///
    /// - `RIPPER_OUTPUT_DIR` (default `ripped_tunes`)
    /// - `RIPPER_EXTRACTOR_BIN` (default `yt-dlp`)
    /// - `RIPPER_PROCESS_TIMEOUT_SECS` (default 300)
    /// - `RIPPER_MAX_URLS` (default 20)
    /// - `RIPPER_RETENTION_SECS` (default 600)
    /// - `RIPPER_SWEEP_INTERVAL_SECS` (default 300)
    /// - `RIPPER_STALE_AFTER_SECS` (default 300)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let output_dir = lookup("RIPPER_OUTPUT_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);
        let extractor_bin = lookup("RIPPER_EXTRACTOR_BIN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.extractor_bin);

        let process_timeout = secs_var(&lookup, "RIPPER_PROCESS_TIMEOUT_SECS")?
            .unwrap_or(defaults.process_timeout);
        let max_urls = match positive_var(&lookup, "RIPPER_MAX_URLS")? {
            Some(n) => n as usize,
            None => defaults.max_urls,
        };

        let retention = RetentionConfig {
            completed_ttl: secs_var(&lookup, "RIPPER_RETENTION_SECS")?
                .unwrap_or(defaults.retention.completed_ttl),
            sweep_interval: secs_var(&lookup, "RIPPER_SWEEP_INTERVAL_SECS")?
                .unwrap_or(defaults.retention.sweep_interval),
            stale_after: secs_var(&lookup, "RIPPER_STALE_AFTER_SECS")?
                .unwrap_or(defaults.retention.stale_after),
            purge_on_shutdown: defaults.retention.purge_on_shutdown,
        };

        Ok(Self {
            output_dir,
            extractor_bin,
            process_timeout,
            max_urls,
            retention,
        })
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_extractor_bin(mut self, bin: impl Into<String>) -> Self {
        self.extractor_bin = bin.into();
        self
    }

    pub fn with_process_timeout(mut self, timeout: Duration) -> Self {
        self.process_timeout = timeout;
        self
    }

    pub fn with_max_urls(mut self, max: usize) -> Self {
        self.max_urls = max;
        self
    }

    pub fn with_retention(mut self, retention: RetentionConfig) -> Self {
        self.retention = retention;
        self
    }
}

fn positive_var<F>(lookup: &F, key: &str) -> Result<Option<u64>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {key} '{raw}': must be a positive integer"
        ))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(Some(parsed))
}

fn secs_var<F>(lookup: &F, key: &str) -> Result<Option<Duration>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(positive_var(lookup, key)?.map(Duration::from_secs))
}
