//! Test doubles for the capability traits.

use crate::artifacts::ArtifactManager;
use crate::audio::{write_silence, AudioDecoder};
use crate::error::{HarkError, Result};
use crate::knowledge::{KnowledgeSnapshot, KnowledgeStore};
use crate::orchestrator::QueryOrchestrator;
use crate::synthesis::SpeechSynthesizer;
use crate::transcription::{Transcriber, TranscriptionFailure, TranscriptionFailureKind};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Accepts WAV input only and copies it through unchanged.
pub struct WavOnlyDecoder;

#[async_trait]
impl AudioDecoder for WavOnlyDecoder {
    async fn decode(&self, input: &Path, output: &Path) -> Result<()> {
        hound::WavReader::open(input).map_err(|e| HarkError::Conversion(e.to_string()))?;
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Returns a fixed transcript or a fixed failure.
pub struct FixedTranscriber(pub std::result::Result<&'static str, TranscriptionFailureKind>);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
    ) -> std::result::Result<String, TranscriptionFailure> {
        assert!(audio_path.exists(), "transcriber got a missing file");
        match self.0 {
            Ok(text) => Ok(text.to_string()),
            Err(TranscriptionFailureKind::Unintelligible) => Err(TranscriptionFailure::Unintelligible),
            Err(TranscriptionFailureKind::ServiceUnavailable) => {
                Err(TranscriptionFailure::ServiceUnavailable("offline".into()))
            }
            Err(TranscriptionFailureKind::Unknown) => Err(TranscriptionFailure::Unknown("?".into())),
        }
    }
}

/// Sleeps before answering.
pub struct SlowTranscriber(pub Duration);

#[async_trait]
impl Transcriber for SlowTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> std::result::Result<String, TranscriptionFailure> {
        tokio::time::sleep(self.0).await;
        Ok("hello".to_string())
    }
}

/// Writes a short silent clip.
pub struct SilentSynth;

#[async_trait]
impl SpeechSynthesizer for SilentSynth {
    async fn synthesize(&self, _text: &str, output: &Path) -> Result<()> {
        write_silence(output, 50, 16_000)
    }
}

/// Bytes of a valid 200 ms WAV file.
pub fn wav_bytes() -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_silence(&path, 200, 16_000).unwrap();
    std::fs::read(path).unwrap()
}

/// Orchestrator over the sample knowledge base with directories under `root`.
pub fn orchestrator(root: &Path, transcriber: Arc<dyn Transcriber>) -> QueryOrchestrator {
    let artifacts =
        Arc::new(ArtifactManager::new(root.join("uploads"), root.join("tts")).unwrap());
    let knowledge = Arc::new(KnowledgeStore::from_snapshot(KnowledgeSnapshot::samples()));
    QueryOrchestrator::with_components(
        knowledge,
        artifacts,
        Arc::new(WavOnlyDecoder),
        transcriber,
        Arc::new(SilentSynth),
    )
}

pub fn dir_len(path: &Path) -> usize {
    std::fs::read_dir(path).unwrap().count()
}
