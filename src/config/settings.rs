//! Configuration settings for Hark.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub knowledge: KnowledgeSettings,
    pub matching: MatchingSettings,
    pub audio: AudioSettings,
    pub transcription: TranscriptionSettings,
    pub synthesis: SynthesisSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for uploads, synthesized audio and the knowledge base.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.hark".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on a voice upload body, in bytes.
    pub max_upload_bytes: usize,
    /// Per-request deadline for the query endpoints.
    pub request_timeout_secs: u64,
    /// URL prefix under which synthesized audio is served.
    pub audio_url_prefix: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_upload_bytes: 16 * 1024 * 1024,
            request_timeout_secs: 120,
            audio_url_prefix: "/static/tts".to_string(),
        }
    }
}

/// Knowledge base source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// Path to the question/answer CSV file.
    pub source: String,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            source: "~/.hark/data/qa.csv".to_string(),
        }
    }
}

/// Fuzzy matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Minimum token-set score (0-100) for an answer to be accepted.
    pub threshold: u8,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            threshold: crate::matching::DEFAULT_THRESHOLD,
        }
    }
}

/// Audio normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// ffmpeg executable used to normalize uploads.
    pub ffmpeg: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

/// Transcription provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    /// OpenAI Whisper API (default).
    #[default]
    Whisper,
    /// External recognizer program (e.g. whisper.cpp).
    Command,
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "whisper" | "openai" => Ok(TranscriptionProvider::Whisper),
            "command" | "local" => Ok(TranscriptionProvider::Command),
            _ => Err(format!("Unknown transcription provider: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionProvider::Whisper => write!(f, "whisper"),
            TranscriptionProvider::Command => write!(f, "command"),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub provider: TranscriptionProvider,
    /// Whisper model (whisper provider).
    pub model: String,
    /// Optional language hint, ISO-639-1.
    pub language: Option<String>,
    /// Recognizer program (command provider).
    pub command: String,
    /// Recognizer arguments; `{input}` is replaced with the WAV path.
    pub args: Vec<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::Whisper,
            model: "whisper-1".to_string(),
            language: None,
            command: "whisper-cli".to_string(),
            args: vec![
                "-nt".to_string(),
                "-f".to_string(),
                "{input}".to_string(),
            ],
        }
    }
}

/// Speech synthesis provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisProvider {
    /// Offline espeak-ng (default).
    #[default]
    Espeak,
    /// OpenAI speech API.
    OpenAI,
}

impl std::str::FromStr for SynthesisProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "espeak" | "espeak-ng" => Ok(SynthesisProvider::Espeak),
            "openai" => Ok(SynthesisProvider::OpenAI),
            _ => Err(format!("Unknown synthesis provider: {}", s)),
        }
    }
}

impl std::fmt::Display for SynthesisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisProvider::Espeak => write!(f, "espeak"),
            SynthesisProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub provider: SynthesisProvider,
    /// espeak-ng executable.
    pub program: String,
    /// Speaking rate in words per minute (espeak).
    pub rate: u32,
    /// espeak voice name, e.g. "en-us".
    pub voice: Option<String>,
    /// OpenAI speech model.
    pub model: String,
    /// OpenAI voice name.
    pub openai_voice: String,
    /// OpenAI speaking speed, 0.25 to 4.0.
    pub openai_speed: f32,
    /// Length of the silent fallback clip.
    pub silence_ms: u32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            provider: SynthesisProvider::Espeak,
            program: "espeak-ng".to_string(),
            rate: 150,
            voice: None,
            model: "tts-1".to_string(),
            openai_voice: "alloy".to_string(),
            openai_speed: 1.0,
            silence_ms: 500,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HarkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hark")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory holding raw uploads and their conversions.
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir().join("uploads")
    }

    /// Directory holding synthesized audio served to clients.
    pub fn audio_out_dir(&self) -> PathBuf {
        self.data_dir().join("static").join("tts")
    }

    /// Get the expanded knowledge base path.
    pub fn knowledge_source(&self) -> PathBuf {
        Self::expand_path(&self.knowledge.source)
    }
}
