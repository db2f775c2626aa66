//! ffmpeg-backed audio normalization.

use super::AudioDecoder;
use crate::config::AudioSettings;
use crate::error::{HarkError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Normalizes audio to mono PCM WAV with ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    program: String,
    sample_rate: u32,
    channels: u16,
}

impl FfmpegDecoder {
    /// Create a decoder producing 16 kHz mono output.
    pub fn new() -> Self {
        Self::with_config("ffmpeg", 16_000, 1)
    }

    pub fn with_config(program: &str, sample_rate: u32, channels: u16) -> Self {
        Self {
            program: program.to_string(),
            sample_rate,
            channels,
        }
    }

    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self::with_config(&settings.ffmpeg, settings.sample_rate, settings.channels)
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioDecoder for FfmpegDecoder {
    #[instrument(skip(self), fields(input = %input.display()))]
    async fn decode(&self, input: &Path, output: &Path) -> Result<()> {
        debug!("Converting {:?} to {} Hz WAV", input, self.sample_rate);

        let result = Command::new(&self.program)
            .arg("-i").arg(input)
            .arg("-vn")
            .arg("-ac").arg(self.channels.to_string())
            .arg("-ar").arg(self.sample_rate.to_string())
            .arg("-acodec").arg("pcm_s16le")
            .arg("-f").arg("wav")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => {
                let written = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
                if written == 0 {
                    return Err(HarkError::Conversion("ffmpeg produced no output".into()));
                }
                Ok(())
            }
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(HarkError::Conversion(format!("ffmpeg exited with {}: {}", out.status, err.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HarkError::ToolNotFound(self.program.clone()))
            }
            Err(e) => Err(HarkError::Conversion(format!("ffmpeg error: {e}"))),
        }
    }
}
