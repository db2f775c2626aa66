//! Pre-flight checks before running the pipeline.
//!
//! Hard requirements fail the command up front. Missing optional
//! collaborators only degrade answers, so they are reported as warnings.

use crate::config::{Settings, SynthesisProvider, TranscriptionProvider};
use crate::error::{HarkError, Result};
use crate::openai::is_api_key_configured;
use std::process::{Command, Stdio};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Serving accepts both voice and text queries.
    Serve,
    /// A typed question needs synthesis only.
    Ask,
    /// A recorded question needs decoding, transcription and synthesis.
    Listen,
}

impl Operation {
    fn needs_audio_input(self) -> bool {
        matches!(self, Operation::Serve | Operation::Listen)
    }
}

/// Run hard pre-flight checks for the given operation.
pub fn check(settings: &Settings, operation: Operation) -> Result<()> {
    if operation == Operation::Listen {
        check_tool(&settings.audio.ffmpeg)?;
    }
    Ok(())
}

/// Describe collaborators that are missing and will degrade answers.
pub fn degradations(settings: &Settings, operation: Operation) -> Vec<String> {
    let mut issues = Vec::new();

    if operation == Operation::Serve && !is_installed(&settings.audio.ffmpeg, "-version") {
        issues.push(format!(
            "{} not found: voice queries will fail",
            settings.audio.ffmpeg
        ));
    }

    if operation.needs_audio_input() {
        match settings.transcription.provider {
            TranscriptionProvider::Whisper if !is_api_key_configured() => {
                issues.push("OPENAI_API_KEY not set: transcripts will be placeholders".to_string())
            }
            TranscriptionProvider::Command
                if !is_installed(&settings.transcription.command, "--help") =>
            {
                issues.push(format!(
                    "{} not found: transcripts will be placeholders",
                    settings.transcription.command
                ))
            }
            _ => {}
        }
    }

    match settings.synthesis.provider {
        SynthesisProvider::Espeak if !is_installed(&settings.synthesis.program, "--version") => {
            issues.push(format!(
                "{} not found: replies will be silent",
                settings.synthesis.program
            ))
        }
        SynthesisProvider::OpenAI if !is_api_key_configured() => {
            issues.push("OPENAI_API_KEY not set: replies will be silent".to_string())
        }
        _ => {}
    }

    issues
}

/// Check if an external tool is available and working.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(HarkError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(HarkError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(HarkError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

/// Whether `name` can be spawned at all.
fn is_installed(name: &str, probe_arg: &str) -> bool {
    match Command::new(name)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => true,
        Err(e) => e.kind() != std::io::ErrorKind::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_has_no_hard_requirements() {
        let mut settings = Settings::default();
        settings.audio.ffmpeg = "hark-no-such-ffmpeg".to_string();
        assert!(check(&settings, Operation::Ask).is_ok());
    }

    #[test]
    fn test_listen_requires_decoder() {
        let mut settings = Settings::default();
        settings.audio.ffmpeg = "hark-no-such-ffmpeg".to_string();
        let err = check(&settings, Operation::Listen).unwrap_err();
        assert!(matches!(err, HarkError::ToolNotFound(_)));
    }

    #[test]
    fn test_missing_synthesizer_is_a_degradation() {
        let mut settings = Settings::default();
        settings.synthesis.program = "hark-no-such-espeak".to_string();
        let issues = degradations(&settings, Operation::Ask);
        assert!(issues.iter().any(|i| i.contains("replies will be silent")));
        // Typed questions never transcribe.
        assert!(!issues.iter().any(|i| i.contains("transcripts")));
    }

    #[test]
    fn test_missing_recognizer_is_a_degradation() {
        let mut settings = Settings::default();
        settings.transcription.provider = TranscriptionProvider::Command;
        settings.transcription.command = "hark-no-such-recognizer".to_string();
        let issues = degradations(&settings, Operation::Listen);
        assert!(issues.iter().any(|i| i.contains("hark-no-such-recognizer")));
    }

    #[test]
    fn test_serve_warns_about_missing_decoder() {
        let mut settings = Settings::default();
        settings.audio.ffmpeg = "hark-no-such-ffmpeg".to_string();
        let issues = degradations(&settings, Operation::Serve);
        assert!(issues
            .iter()
            .any(|i| i == "hark-no-such-ffmpeg not found: voice queries will fail"));

        // Serving never hard-fails on a missing decoder.
        assert!(check(&settings, Operation::Serve).is_ok());
    }
}
