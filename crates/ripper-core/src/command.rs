//! Argument vectors for the external extractor (yt-dlp compatible).

use std::fmt;
use std::path::{Path, PathBuf};

use crate::job::{Browser, SourceType};

/// Extension of every artifact the extractor is asked to produce.
pub const AUDIO_EXTENSION: &str = "mp3";

/// A fully resolved extractor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ExtractorCommand {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Display for ExtractorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Builds extractor invocations that write into one shared output directory.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    output_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output template: `<dir>/<prefix>_%(title)s.%(ext)s`.
    fn output_template(&self, prefix: &str) -> String {
        self.output_dir
            .join(format!("{prefix}_%(title)s.%(ext)s"))
            .to_string_lossy()
            .into_owned()
    }

    /// Audio-only MP3 extraction of `url`, files named after `prefix`.
    ///
    /// SoundCloud links never expand into whole playlists. A browser hint adds
    /// cookie sourcing from that browser.
    pub fn build(
        &self,
        prefix: &str,
        url: &str,
        source: SourceType,
        browser: Option<Browser>,
    ) -> ExtractorCommand {
        let mut args = vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            AUDIO_EXTENSION.to_string(),
        ];

        if source == SourceType::Soundcloud {
            args.push("--no-playlist".to_string());
        }

        if let Some(browser) = browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.as_str().to_string());
        }

        args.push("-o".to_string());
        args.push(self.output_template(prefix));
        args.push(url.to_string());

        ExtractorCommand {
            program: self.program.clone(),
            args,
        }
    }
}
