//! Offline synthesis with espeak-ng.

use super::SpeechSynthesizer;
use crate::error::{HarkError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// espeak-ng command-line synthesizer.
#[derive(Debug, Clone)]
pub struct EspeakSynthesizer {
    program: String,
    rate: u32,
    voice: Option<String>,
}

impl EspeakSynthesizer {
    /// espeak-ng at 150 words per minute with the default voice.
    pub fn new() -> Self {
        Self::with_config("espeak-ng", 150, None)
    }

    pub fn with_config(program: &str, rate: u32, voice: Option<&str>) -> Self {
        Self {
            program: program.to_string(),
            rate,
            voice: voice.map(str::to_string),
        }
    }

    fn build_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec!["-s".to_string(), self.rate.to_string()];
        if let Some(voice) = &self.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        args.push("-w".to_string());
        args.push(output.to_string_lossy().into_owned());
        // Text is passed on stdin so it is never parsed as an option.
        args.push("--stdin".to_string());
        args
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    #[instrument(skip(self, text), fields(output = %output.display()))]
    async fn synthesize(&self, text: &str, output: &Path) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        debug!("Synthesizing {} characters with {}", text.len(), self.program);

        let mut child = Command::new(&self.program)
            .args(self.build_args(output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    HarkError::ToolNotFound(self.program.clone())
                } else {
                    HarkError::Synthesis(format!("{} failed to start: {e}", self.program))
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let out = child.wait_with_output().await?;
        if !out.status.success() {
            let err = String::from_utf8_lossy(&out.stderr);
            return Err(HarkError::ToolFailed(format!(
                "{} exited with {}: {}",
                self.program,
                out.status,
                err.trim()
            )));
        }
        Ok(())
    }
}
