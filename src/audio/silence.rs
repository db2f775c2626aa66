//! Silent WAV generation.

use crate::error::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Write `duration_ms` of 16-bit mono silence to `path`.
pub fn write_silence(path: &Path, duration_ms: u32, sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    let total_samples = u64::from(sample_rate) * u64::from(duration_ms) / 1000;
    for _ in 0..total_samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}
