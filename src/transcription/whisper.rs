//! OpenAI Whisper transcription implementation.

use super::{Transcriber, TranscriptionFailure};
use crate::openai::create_client;
use async_openai::error::OpenAIError;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with default settings.
    pub fn new() -> Self {
        Self::with_config("whisper-1", None)
    }

    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(model: &str, language: Option<&str>) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            language: language.map(str::to_string),
        }
    }
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

/// Map API client errors onto transcription failure kinds.
fn classify(err: OpenAIError) -> TranscriptionFailure {
    match err {
        OpenAIError::Reqwest(e) => TranscriptionFailure::ServiceUnavailable(e.to_string()),
        OpenAIError::ApiError(e) => TranscriptionFailure::ServiceUnavailable(e.to_string()),
        other => TranscriptionFailure::Unknown(other.to_string()),
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionFailure> {
        debug!("Transcribing audio file with {}", self.model);

        let file_bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| TranscriptionFailure::Unknown(format!("cannot read audio: {e}")))?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.wav")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| TranscriptionFailure::Unknown(format!("Failed to build request: {e}")))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(classify)?;

        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscriptionFailure::Unintelligible);
        }

        debug!("Transcribed {} characters", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptionFailureKind;

    #[test]
    fn test_invalid_argument_is_unknown() {
        let failure = classify(OpenAIError::InvalidArgument("bad".into()));
        assert_eq!(failure.kind(), TranscriptionFailureKind::Unknown);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_unknown() {
        let transcriber = WhisperTranscriber::new();
        let err = transcriber
            .transcribe(Path::new("/nonexistent/hark/input.wav"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), TranscriptionFailureKind::Unknown);
    }
}
