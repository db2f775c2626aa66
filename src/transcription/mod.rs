//! Transcription module for Hark.
//!
//! Speech-to-text backends sit behind the [`Transcriber`] trait. The
//! [`TranscriptionAdapter`] never fails: every backend error is classified
//! into one of three kinds and replaced by a stable placeholder transcript,
//! so the pipeline always proceeds to retrieval.

mod command;
mod whisper;

pub use command::CommandTranscriber;
pub use whisper::WhisperTranscriber;

use crate::config::{TranscriptionProvider, TranscriptionSettings};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Classification of a failed transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionFailureKind {
    /// The service ran but recognized no speech.
    Unintelligible,
    /// The service could not be reached or returned an error.
    ServiceUnavailable,
    Unknown,
}

impl TranscriptionFailureKind {
    /// Transcript text substituted for a failed transcription.
    pub fn placeholder(&self) -> &'static str {
        match self {
            TranscriptionFailureKind::Unintelligible => "Could not understand the audio",
            TranscriptionFailureKind::ServiceUnavailable => "Speech service unavailable",
            TranscriptionFailureKind::Unknown => "Error transcribing audio",
        }
    }
}

impl std::fmt::Display for TranscriptionFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionFailureKind::Unintelligible => write!(f, "unintelligible"),
            TranscriptionFailureKind::ServiceUnavailable => write!(f, "service unavailable"),
            TranscriptionFailureKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Error reported by a transcription backend.
#[derive(Error, Debug)]
pub enum TranscriptionFailure {
    #[error("no speech recognized")]
    Unintelligible,

    #[error("speech service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("transcription failed: {0}")]
    Unknown(String),
}

impl TranscriptionFailure {
    pub fn kind(&self) -> TranscriptionFailureKind {
        match self {
            TranscriptionFailure::Unintelligible => TranscriptionFailureKind::Unintelligible,
            TranscriptionFailure::ServiceUnavailable(_) => {
                TranscriptionFailureKind::ServiceUnavailable
            }
            TranscriptionFailure::Unknown(_) => TranscriptionFailureKind::Unknown,
        }
    }
}

/// Trait for speech-to-text services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a canonical 16 kHz mono WAV file.
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionFailure>;
}

/// Transcript handed to retrieval, possibly a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResult {
    pub text: String,
    pub ok: bool,
    pub reason: Option<TranscriptionFailureKind>,
}

impl TranscriptResult {
    pub fn recognized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ok: true,
            reason: None,
        }
    }

    pub fn failed(kind: TranscriptionFailureKind) -> Self {
        Self {
            text: kind.placeholder().to_string(),
            ok: false,
            reason: Some(kind),
        }
    }
}

/// Fail-open wrapper around a [`Transcriber`].
#[derive(Clone)]
pub struct TranscriptionAdapter {
    backend: Arc<dyn Transcriber>,
}

impl TranscriptionAdapter {
    pub fn new(backend: Arc<dyn Transcriber>) -> Self {
        Self { backend }
    }

    /// Build the backend selected in settings.
    pub fn from_settings(settings: &TranscriptionSettings) -> Self {
        let backend: Arc<dyn Transcriber> = match settings.provider {
            TranscriptionProvider::Whisper => {
                info!("Using Whisper transcription ({})", settings.model);
                Arc::new(WhisperTranscriber::with_config(
                    &settings.model,
                    settings.language.as_deref(),
                ))
            }
            TranscriptionProvider::Command => {
                info!("Using command transcription ({})", settings.command);
                Arc::new(CommandTranscriber::new(&settings.command, settings.args.clone()))
            }
        };
        Self::new(backend)
    }

    /// Transcribe, converting any failure into a placeholder result.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    pub async fn transcribe(&self, audio_path: &Path) -> TranscriptResult {
        match self.backend.transcribe(audio_path).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("Transcription returned no text");
                TranscriptResult::failed(TranscriptionFailureKind::Unintelligible)
            }
            Ok(text) => TranscriptResult::recognized(text.trim()),
            Err(e) => {
                warn!("Transcription degraded ({}): {}", e.kind(), e);
                TranscriptResult::failed(e.kind())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(fn() -> Result<String, TranscriptionFailure>);

    #[async_trait]
    impl Transcriber for Scripted {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String, TranscriptionFailure> {
            (self.0)()
        }
    }

    async fn run(f: fn() -> Result<String, TranscriptionFailure>) -> TranscriptResult {
        TranscriptionAdapter::new(Arc::new(Scripted(f)))
            .transcribe(Path::new("in.wav"))
            .await
    }

    #[tokio::test]
    async fn test_success_is_trimmed() {
        let result = run(|| Ok("  what is your name \n".to_string())).await;
        assert_eq!(result, TranscriptResult::recognized("what is your name"));
    }

    #[tokio::test]
    async fn test_blank_text_is_unintelligible() {
        let result = run(|| Ok("   ".to_string())).await;
        assert!(!result.ok);
        assert_eq!(result.reason, Some(TranscriptionFailureKind::Unintelligible));
        assert_eq!(result.text, "Could not understand the audio");
    }

    #[tokio::test]
    async fn test_failures_map_to_distinct_placeholders() {
        let unintelligible = run(|| Err(TranscriptionFailure::Unintelligible)).await;
        let unavailable =
            run(|| Err(TranscriptionFailure::ServiceUnavailable("timeout".into()))).await;
        let unknown = run(|| Err(TranscriptionFailure::Unknown("boom".into()))).await;

        assert_eq!(unintelligible.reason, Some(TranscriptionFailureKind::Unintelligible));
        assert_eq!(unavailable.reason, Some(TranscriptionFailureKind::ServiceUnavailable));
        assert_eq!(unknown.reason, Some(TranscriptionFailureKind::Unknown));

        assert_ne!(unintelligible.text, unavailable.text);
        assert_ne!(unavailable.text, unknown.text);
        assert_ne!(unknown.text, unintelligible.text);
        // Details from the backend never reach the transcript.
        assert!(!unavailable.text.contains("timeout"));
    }
}
