//! Speech synthesis for Hark.
//!
//! Text-to-speech backends sit behind the [`SpeechSynthesizer`] trait. The
//! [`SynthesisAdapter`] guarantees a playable artifact: when the backend
//! fails or writes nothing, a short silent clip is written under the same
//! generated name.

mod espeak;
mod openai;

pub use espeak::EspeakSynthesizer;
pub use openai::OpenAiSynthesizer;

use crate::audio::write_silence;
use crate::config::{SynthesisProvider, SynthesisSettings};
use crate::error::{HarkError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Sample rate of the silent fallback clip.
const SILENCE_SAMPLE_RATE: u32 = 16_000;

/// Trait for text-to-speech services.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` as WAV audio at `output`.
    async fn synthesize(&self, text: &str, output: &Path) -> Result<()>;
}

/// A synthesized audio file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisArtifact {
    /// Bare file name, unique per call.
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    /// True when the backend produced speech; false for the silent fallback.
    pub bytes_written: bool,
}

/// Generate a collision-free artifact name.
pub fn artifact_name() -> String {
    format!("tts_{}.wav", Uuid::new_v4().simple())
}

/// Fail-safe wrapper around a [`SpeechSynthesizer`].
#[derive(Clone)]
pub struct SynthesisAdapter {
    backend: Arc<dyn SpeechSynthesizer>,
    silence_ms: u32,
}

impl SynthesisAdapter {
    pub fn new(backend: Arc<dyn SpeechSynthesizer>, silence_ms: u32) -> Self {
        Self {
            backend,
            silence_ms,
        }
    }

    /// Build the backend selected in settings.
    pub fn from_settings(settings: &SynthesisSettings) -> Self {
        let backend: Arc<dyn SpeechSynthesizer> = match settings.provider {
            SynthesisProvider::Espeak => {
                info!("Using espeak synthesis ({} wpm)", settings.rate);
                Arc::new(EspeakSynthesizer::with_config(
                    &settings.program,
                    settings.rate,
                    settings.voice.as_deref(),
                ))
            }
            SynthesisProvider::OpenAI => {
                info!(
                    "Using OpenAI synthesis ({}, {}, {}x)",
                    settings.model, settings.openai_voice, settings.openai_speed
                );
                Arc::new(OpenAiSynthesizer::with_config(
                    &settings.model,
                    &settings.openai_voice,
                    settings.openai_speed,
                ))
            }
        };
        Self::new(backend, settings.silence_ms)
    }

    /// Synthesize `text` into a new artifact inside `output_dir`.
    ///
    /// Only fails when even the silent fallback cannot be written.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn synthesize(&self, text: &str, output_dir: &Path) -> Result<SynthesisArtifact> {
        let file_name = artifact_name();
        let path = output_dir.join(&file_name);

        let spoken = match self.backend.synthesize(text, &path).await {
            Ok(()) if has_audio(&path).await => true,
            Ok(()) => {
                warn!("Synthesis produced no output, writing silence");
                false
            }
            Err(e) => {
                warn!("Synthesis degraded: {}", e);
                false
            }
        };

        if !spoken {
            write_silence(&path, self.silence_ms, SILENCE_SAMPLE_RATE)
                .map_err(|e| HarkError::Synthesis(format!("silent fallback failed: {e}")))?;
        }

        debug!("Wrote {}", file_name);
        Ok(SynthesisArtifact {
            file_name,
            path,
            bytes_written: spoken,
        })
    }
}

async fn has_audio(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
