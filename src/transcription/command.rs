//! Transcription through an external recognizer program.
//!
//! Works with offline recognizers such as whisper.cpp that print the
//! hypothesis to stdout.

use super::{Transcriber, TranscriptionFailure};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Placeholder replaced by the audio path in recognizer arguments.
const INPUT_TOKEN: &str = "{input}";

/// Runs a local recognizer program per request.
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    fn build_args(&self, audio_path: &Path) -> Vec<String> {
        let input = audio_path.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(INPUT_TOKEN, &input))
            .collect();
        if !self.args.iter().any(|a| a.contains(INPUT_TOKEN)) {
            args.push(input.into_owned());
        }
        args
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionFailure> {
        let args = self.build_args(audio_path);
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscriptionFailure::ServiceUnavailable(format!("{} not found", self.program))
                } else {
                    TranscriptionFailure::Unknown(format!("{} failed to start: {e}", self.program))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionFailure::ServiceUnavailable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            return Err(TranscriptionFailure::Unintelligible);
        }
        Ok(text)
    }
}
