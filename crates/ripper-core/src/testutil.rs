//! Stand-ins for the extractor and the event sink.
//!
//! [`MockProcessRunner`] plays back a list of [`ScriptedRun`]s in order,
//! writing fake MP3s where the real tool would and remembering every command
//! it was handed. [`MockReporter`] keeps the labels of the events it saw.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::command::{AUDIO_EXTENSION, ExtractorCommand};
use crate::error::AppError;
use crate::events::{JobEvent, JobReporter};
use crate::traits::{ProcessOutcome, ProcessRunner};

// ---------------------------------------------------------------------------
// MockProcessRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Behavior {
    Produce(Vec<String>),
    Fail { stdout: String, stderr: String },
    TimeOut,
    Panic,
}

/// What one extractor invocation should do.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    behavior: Behavior,
    delay: Duration,
}

impl ScriptedRun {
    /// Exit 0 after writing one `<prefix>_<title>.mp3` per title. An empty
    /// list simulates a silent failure.
    pub fn produces(titles: &[&str]) -> Self {
        Self {
            behavior: Behavior::Produce(titles.iter().map(|t| t.to_string()).collect()),
            delay: Duration::ZERO,
        }
    }

    /// Exit nonzero with `stderr`.
    pub fn fails(stderr: &str) -> Self {
        Self::fails_with(stderr, "")
    }

    pub fn fails_with(stderr: &str, stdout: &str) -> Self {
        Self {
            behavior: Behavior::Fail {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
            delay: Duration::ZERO,
        }
    }

    pub fn times_out() -> Self {
        Self {
            behavior: Behavior::TimeOut,
            delay: Duration::ZERO,
        }
    }

    /// Panic inside the runner, to exercise task isolation.
    pub fn panics() -> Self {
        Self {
            behavior: Behavior::Panic,
            delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` before acting.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Process runner that follows a script instead of spawning anything.
///
/// Runs are consumed in order; once the script is exhausted every further run
/// produces a single `track` artifact. Artifacts are written through the
/// command's own `-o` template, exactly where the real extractor would put them.
#[derive(Clone)]
pub struct MockProcessRunner {
    output_dir: PathBuf,
    script: Arc<Mutex<Vec<ScriptedRun>>>,
    calls: Arc<Mutex<Vec<ExtractorCommand>>>,
}

impl MockProcessRunner {
    pub fn new(output_dir: &Path, script: Vec<ScriptedRun>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            script: Arc::new(Mutex::new(script)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every command received so far.
    pub fn calls(&self) -> Vec<ExtractorCommand> {
        self.calls.lock().unwrap().clone()
    }

    fn next_run(&self) -> ScriptedRun {
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            ScriptedRun::produces(&["track"])
        } else {
            script.remove(0)
        }
    }

    fn write_artifacts(&self, command: &ExtractorCommand, titles: &[String]) {
        let template = command
            .args
            .iter()
            .position(|a| a == "-o")
            .and_then(|i| command.args.get(i + 1))
            .expect("command has an output template");
        for title in titles {
            let path = template
                .replace("%(title)s", title)
                .replace("%(ext)s", AUDIO_EXTENSION);
            let path = PathBuf::from(path);
            assert!(
                path.starts_with(&self.output_dir),
                "artifact {} escapes the output dir",
                path.display()
            );
            std::fs::write(&path, b"ID3").unwrap();
        }
    }
}

impl ProcessRunner for MockProcessRunner {
    async fn run(
        &self,
        command: &ExtractorCommand,
        _timeout: Duration,
    ) -> Result<ProcessOutcome, AppError> {
        self.calls.lock().unwrap().push(command.clone());
        let run = self.next_run();
        if !run.delay.is_zero() {
            tokio::time::sleep(run.delay).await;
        }
        match run.behavior {
            Behavior::Produce(titles) => {
                self.write_artifacts(command, &titles);
                Ok(ProcessOutcome::Exited {
                    success: true,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
            Behavior::Fail { stdout, stderr } => Ok(ProcessOutcome::Exited {
                success: false,
                stdout,
                stderr,
            }),
            Behavior::TimeOut => Ok(ProcessOutcome::TimedOut),
            Behavior::Panic => panic!("scripted extractor panic"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl JobReporter for MockReporter {
    fn report(&self, event: JobEvent<'_>) {
        let label = match &event {
            JobEvent::Submitted { .. } => "Submitted",
            JobEvent::Started { .. } => "Started",
            JobEvent::ItemStarted { .. } => "ItemStarted",
            JobEvent::ItemSucceeded { .. } => "ItemSucceeded",
            JobEvent::ItemFailed { .. } => "ItemFailed",
            JobEvent::Completed { .. } => "Completed",
            JobEvent::Failed { .. } => "Failed",
            JobEvent::PurgeScheduled { .. } => "PurgeScheduled",
            JobEvent::Purged { .. } => "Purged",
            JobEvent::StaleEvicted { .. } => "StaleEvicted",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
