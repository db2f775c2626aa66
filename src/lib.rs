//! Hark - Spoken Q&A Assistant
//!
//! Answers spoken or typed questions from a static question/answer knowledge
//! base and replies with synthesized speech.
//!
//! # Overview
//!
//! A voice query flows through the pipeline as:
//!
//! 1. the upload is persisted under a per-request scope
//! 2. `ffmpeg` normalizes it to 16 kHz mono WAV
//! 3. a speech-to-text backend transcribes it (failures become placeholders)
//! 4. the transcript is fuzzy-matched against the knowledge base
//! 5. the answer is synthesized to a WAV file (failures become silence)
//! 6. transient files are deleted and the reply is returned
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `knowledge` - Q&A snapshots, CSV loading, atomic reload
//! - `matching` - Token set similarity and answer resolution
//! - `audio` - Audio normalization and silence generation
//! - `transcription` - Speech-to-text adapters
//! - `synthesis` - Text-to-speech adapters
//! - `artifacts` - Per-request file lifecycle
//! - `orchestrator` - Pipeline coordination
//! - `cli` - Command line and HTTP front ends
//!
//! # Example
//!
//! ```rust,no_run
//! use hark::config::Settings;
//! use hark::orchestrator::QueryOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = QueryOrchestrator::new(&settings)?;
//!
//!     let response = orchestrator.text_query("What is your name?").await?;
//!     println!("{} ({})", response.reply, response.audio_url);
//!
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod matching;
pub mod openai;
pub mod orchestrator;
pub mod synthesis;
pub mod transcription;

#[cfg(test)]
mod testing;

pub use error::{HarkError, Result};
