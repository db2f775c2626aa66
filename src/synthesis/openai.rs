//! OpenAI speech API synthesis.

use super::SpeechSynthesizer;
use crate::error::{HarkError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Speed range accepted by the speech endpoint.
const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// Synthesizer backed by the OpenAI `audio/speech` endpoint.
pub struct OpenAiSynthesizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
    speed: f32,
}

impl OpenAiSynthesizer {
    pub fn new() -> Self {
        Self::with_config("tts-1", "alloy", 1.0)
    }

    pub fn with_config(model: &str, voice: &str, speed: f32) -> Self {
        Self {
            client: create_client(),
            model: parse_model(model),
            voice: parse_voice(voice),
            speed: clamp_speed(speed),
        }
    }
}

impl Default for OpenAiSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_model(model: &str) -> SpeechModel {
    match model {
        "tts-1-hd" => SpeechModel::Tts1Hd,
        _ => SpeechModel::Tts1,
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if !speed.is_finite() {
        warn!("Ignoring speech speed {}", speed);
        return 1.0;
    }
    let clamped = speed.clamp(MIN_SPEED, MAX_SPEED);
    if clamped != speed {
        warn!("Speech speed {} clamped to {}", speed, clamped);
    }
    clamped
}

fn parse_voice(voice: &str) -> Voice {
    match voice.to_lowercase().as_str() {
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Alloy,
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    #[instrument(skip(self, text), fields(output = %output.display()))]
    async fn synthesize(&self, text: &str, output: &Path) -> Result<()> {
        debug!("Requesting speech for {} characters", text.len());

        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.model.clone())
            .voice(self.voice.clone())
            .speed(self.speed)
            .response_format(SpeechResponseFormat::Wav)
            .build()
            .map_err(|e| HarkError::Synthesis(format!("Failed to build request: {e}")))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| HarkError::OpenAI(format!("Speech API error: {e}")))?;

        tokio::fs::write(output, &response.bytes).await?;
        Ok(())
    }
}
