//! Configuration module for Hark.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    AudioSettings, GeneralSettings, KnowledgeSettings, MatchingSettings, ServerSettings,
    Settings, SynthesisProvider, SynthesisSettings, TranscriptionProvider,
    TranscriptionSettings,
};
