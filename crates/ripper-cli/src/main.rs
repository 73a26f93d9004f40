use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ripper_core::{
    Browser, CommandBuilder, ConvertService, ConverterConfig, JobId, JobRecord, JobStatus,
    SourceType, TokioProcessRunner, TracingJobReporter,
};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "ripper", version, about = "Convert YouTube and SoundCloud links to MP3")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one or more links as MP3 and wait for the result
    Convert {
        /// Links to convert (more than one runs as a batch)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Where the links come from: "youtube" or "soundcloud"
        #[arg(short, long, default_value = "youtube")]
        source: String,

        /// Browser to read cookies from (e.g., "firefox")
        #[arg(short, long, env = "RIPPER_BROWSER", default_value = "")]
        browser: String,

        /// Directory the MP3 files are written to
        #[arg(short, long, env = "RIPPER_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Print the extractor invocation for a link without running it
    Command {
        /// Link to build the command for
        url: String,

        /// Where the link comes from: "youtube" or "soundcloud"
        #[arg(short, long, default_value = "youtube")]
        source: String,

        /// Artifact file prefix
        #[arg(short, long, default_value = "preview")]
        prefix: String,

        /// Browser to read cookies from (e.g., "firefox")
        #[arg(short, long, default_value = "")]
        browser: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ripper=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            urls,
            source,
            browser,
            output_dir,
        } => {
            let mut config = ConverterConfig::from_env()?;
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }
            cmd_convert(config, urls, &source, &browser).await?;
        }
        Commands::Command {
            url,
            source,
            prefix,
            browser,
        } => {
            let config = ConverterConfig::from_env()?;
            cmd_command(&config, &url, &source, &prefix, &browser)?;
        }
    }

    Ok(())
}

async fn cmd_convert(
    config: ConverterConfig,
    urls: Vec<String>,
    source: &str,
    browser: &str,
) -> Result<()> {
    // files are the deliverable here, not a temporary download
    let retention = config.retention.clone().with_purge_on_shutdown(false);
    let config = config.with_retention(retention);

    let service = ConvertService::new(config, TokioProcessRunner, Arc::new(TracingJobReporter))
        .context("Failed to start conversion service")?;

    let request = service.prepare(urls, source, browser)?;
    let job_id = service.submit(request)?;
    tracing::info!("Submitted job {job_id}");

    let job = wait_for(&service, &job_id).await?;
    service.shutdown().await;

    for file in &job.files {
        println!("{}", service.output_dir().join(file).display());
    }
    for error in &job.errors {
        eprintln!("{error}");
    }

    match job.status {
        JobStatus::Complete => {
            println!(
                "\n{} file(s) written to {}",
                job.files.len(),
                service.output_dir().display()
            );
            Ok(())
        }
        _ => anyhow::bail!(
            "{}",
            job.error.as_deref().unwrap_or("Conversion failed")
        ),
    }
}

/// Poll until the job reaches a terminal state, logging progress changes.
async fn wait_for(
    service: &ConvertService<TokioProcessRunner>,
    job_id: &JobId,
) -> Result<JobRecord> {
    let mut last_detail = String::new();
    loop {
        let job = service.status(job_id)?;
        if job.status.is_terminal() {
            return Ok(job);
        }
        if job.status_detail != last_detail {
            tracing::info!("{}", job.status_detail);
            last_detail = job.status_detail;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn cmd_command(
    config: &ConverterConfig,
    url: &str,
    source: &str,
    prefix: &str,
    browser: &str,
) -> Result<()> {
    let source: SourceType = source
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid source type: {source}"))?;

    let builder = CommandBuilder::new(&config.extractor_bin, &config.output_dir);
    let command = builder.build(prefix, url, source, Browser::from_hint(browser));

    println!("{command}");
    Ok(())
}
