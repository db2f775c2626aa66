//! Audio normalization and generation utilities.
//!
//! Uploads arrive in arbitrary containers and are normalized to 16 kHz mono
//! PCM WAV before transcription. Conversion is delegated to ffmpeg.

mod converter;
mod silence;

pub use converter::FfmpegDecoder;
pub use silence::write_silence;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for converting uploaded audio into canonical PCM WAV.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode `input` and write canonical WAV to `output`.
    async fn decode(&self, input: &Path, output: &Path) -> Result<()>;
}
