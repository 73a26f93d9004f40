//! Core of the Ripper audio converter: job model, extractor orchestration,
//! batch aggregation and artifact retention.

pub mod batch;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod job;
pub mod process;
pub mod service;
pub mod store;
pub mod sweeper;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod traits;
pub mod util;
pub mod validate;

pub use command::{CommandBuilder, ExtractorCommand};
pub use config::{ConverterConfig, RetentionConfig};
pub use engine::ConversionEngine;
pub use error::AppError;
pub use events::{JobEvent, JobReporter, TracingJobReporter};
pub use job::{Browser, ConvertRequest, JobId, JobRecord, JobStatus, SourceType};
pub use process::TokioProcessRunner;
pub use service::ConvertService;
pub use store::JobStore;
pub use traits::{ProcessOutcome, ProcessRunner};
