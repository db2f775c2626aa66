//! Query orchestrator for Hark.
//!
//! Runs the voice and text flows:
//!
//! - voice: `Received -> Persisted -> Decoded -> Transcribed -> Matched ->
//!   Synthesized -> Cleaned -> Responded`
//! - text: `Received -> Matched -> Synthesized -> Responded`
//!
//! Each stage reports a [`StageOutcome`]. Transcription and synthesis degrade
//! instead of failing; only invalid input, conversion failures, and internal
//! errors end a request early, and transient files are released either way.

use crate::artifacts::{ArtifactManager, RequestId, RequestScope};
use crate::audio::{AudioDecoder, FfmpegDecoder};
use crate::config::Settings;
use crate::error::{HarkError, Result};
use crate::knowledge::{KnowledgeSnapshot, KnowledgeStore};
use crate::matching::{MatchResult, Matcher};
use crate::synthesis::{SpeechSynthesizer, SynthesisAdapter};
use crate::transcription::{TranscriptResult, Transcriber, TranscriptionAdapter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Default URL prefix for synthesized audio.
const DEFAULT_AUDIO_URL_PREFIX: &str = "/static/tts";

/// Default length of the silent synthesis fallback.
const DEFAULT_SILENCE_MS: u32 = 500;

/// Kind of incoming query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Voice,
    Text,
}

/// Payload of an incoming query.
#[derive(Debug, Clone)]
pub enum QueryPayload {
    Audio { bytes: Vec<u8>, file_name: String },
    Text(String),
}

/// A single query as received from a caller.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub payload: QueryPayload,
}

impl QueryRequest {
    pub fn voice(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            payload: QueryPayload::Audio {
                bytes,
                file_name: file_name.into(),
            },
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: QueryPayload::Text(text.into()),
        }
    }

    pub fn kind(&self) -> QueryKind {
        match self.payload {
            QueryPayload::Audio { .. } => QueryKind::Voice,
            QueryPayload::Text(_) => QueryKind::Text,
        }
    }
}

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Persisted,
    Decoded,
    Transcribed,
    Matched,
    Synthesized,
    Cleaned,
    Responded,
}

/// Result of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    /// Completed with a substitute value.
    Degraded(String),
    /// Ended the request.
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Per-request stage log.
struct Trace {
    request_id: RequestId,
    records: Vec<StageRecord>,
}

impl Trace {
    fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            records: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        match &outcome {
            StageOutcome::Success => debug!(request = %self.request_id, "{:?}", stage),
            StageOutcome::Degraded(why) => {
                warn!(request = %self.request_id, "{:?} degraded: {}", stage, why)
            }
            StageOutcome::Fatal(why) => {
                error!(request = %self.request_id, "{:?} failed: {}", stage, why)
            }
        }
        self.records.push(StageRecord { stage, outcome });
    }

    fn ok(&mut self, stage: Stage) {
        self.record(stage, StageOutcome::Success);
    }

    fn fail(&mut self, stage: Stage, err: HarkError) -> HarkError {
        self.record(stage, StageOutcome::Fatal(err.to_string()));
        err
    }
}

/// Uniform reply for both flows.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub request_id: RequestId,
    pub kind: QueryKind,
    /// Transcript used as the query (voice only; may be a placeholder).
    pub transcript: Option<TranscriptResult>,
    pub reply: String,
    pub audio_file: String,
    pub audio_url: String,
    pub matched: bool,
    pub score: u8,
    /// True when any stage fell back to a substitute.
    pub degraded: bool,
    pub stages: Vec<StageRecord>,
}

/// Read-only operational snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub status: &'static str,
    pub qa_pairs_loaded: usize,
    pub version: &'static str,
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
    /// Local path of the knowledge file; kept off the wire.
    #[serde(skip)]
    pub knowledge_source: String,
}

/// Composes knowledge, matching, transcription and synthesis.
pub struct QueryOrchestrator {
    knowledge: Arc<KnowledgeStore>,
    matcher: Matcher,
    artifacts: Arc<ArtifactManager>,
    decoder: Arc<dyn AudioDecoder>,
    transcriber: TranscriptionAdapter,
    synthesizer: SynthesisAdapter,
    audio_url_prefix: String,
}

impl QueryOrchestrator {
    /// Build the orchestrator and its collaborators from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let knowledge = Arc::new(KnowledgeStore::open(settings.knowledge_source()));
        let artifacts = Arc::new(ArtifactManager::from_settings(settings)?);

        Ok(Self {
            knowledge,
            matcher: Matcher::new(settings.matching.threshold),
            artifacts,
            decoder: Arc::new(FfmpegDecoder::from_settings(&settings.audio)),
            transcriber: TranscriptionAdapter::from_settings(&settings.transcription),
            synthesizer: SynthesisAdapter::from_settings(&settings.synthesis),
            audio_url_prefix: settings.server.audio_url_prefix.clone(),
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        knowledge: Arc<KnowledgeStore>,
        artifacts: Arc<ArtifactManager>,
        decoder: Arc<dyn AudioDecoder>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            knowledge,
            matcher: Matcher::default(),
            artifacts,
            decoder,
            transcriber: TranscriptionAdapter::new(transcriber),
            synthesizer: SynthesisAdapter::new(synthesizer, DEFAULT_SILENCE_MS),
            audio_url_prefix: DEFAULT_AUDIO_URL_PREFIX.to_string(),
        }
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_audio_url_prefix(mut self, prefix: &str) -> Self {
        self.audio_url_prefix = prefix.to_string();
        self
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    pub fn artifacts(&self) -> &Arc<ArtifactManager> {
        &self.artifacts
    }

    /// Dispatch a query to the matching flow.
    pub async fn handle(&self, request: QueryRequest) -> Result<QueryResponse> {
        match request.payload {
            QueryPayload::Audio { bytes, file_name } => self.voice_query(&bytes, &file_name).await,
            QueryPayload::Text(text) => self.text_query(&text).await,
        }
    }

    /// Answer a typed question.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn text_query(&self, text: &str) -> Result<QueryResponse> {
        let mut trace = Trace::new(RequestId::new());

        let text = text.trim();
        if text.is_empty() {
            return Err(trace.fail(
                Stage::Received,
                HarkError::InvalidInput("no text provided".into()),
            ));
        }
        trace.ok(Stage::Received);

        let result = self.respond(&mut trace, QueryKind::Text, None, text).await;
        Self::finish(trace, result)
    }

    /// Answer a spoken question from raw uploaded audio.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn voice_query(&self, bytes: &[u8], file_name: &str) -> Result<QueryResponse> {
        let scope = self.artifacts.begin();
        let mut trace = Trace::new(scope.id());

        if bytes.is_empty() {
            return Err(trace.fail(
                Stage::Received,
                HarkError::InvalidInput("no audio provided".into()),
            ));
        }
        trace.ok(Stage::Received);

        let result = self.run_voice(&scope, &mut trace, bytes, file_name).await;

        let removed = scope.release();
        debug!("Removed {} transient file(s)", removed);
        trace.ok(Stage::Cleaned);

        Self::finish(trace, result)
    }

    async fn run_voice(
        &self,
        scope: &RequestScope,
        trace: &mut Trace,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<QueryResponse> {
        let upload = scope
            .persist_upload(bytes, file_name)
            .await
            .map_err(|e| trace.fail(Stage::Persisted, e))?;
        trace.ok(Stage::Persisted);

        let wav = scope.derived_path(&upload, "wav");
        self.decoder
            .decode(&upload, &wav)
            .await
            .map_err(|e| trace.fail(Stage::Decoded, e))?;
        trace.ok(Stage::Decoded);

        let transcript = self.transcriber.transcribe(&wav).await;
        match transcript.reason {
            None => trace.ok(Stage::Transcribed),
            Some(kind) => trace.record(Stage::Transcribed, StageOutcome::Degraded(kind.to_string())),
        }
        info!("Transcript: {}", transcript.text);

        let query = transcript.text.clone();
        self.respond(trace, QueryKind::Voice, Some(transcript), &query).await
    }

    /// Shared tail of both flows: match, synthesize, build the response.
    async fn respond(
        &self,
        trace: &mut Trace,
        kind: QueryKind,
        transcript: Option<TranscriptResult>,
        query: &str,
    ) -> Result<QueryResponse> {
        let snapshot = self.knowledge.current();
        let MatchResult {
            answer,
            score,
            matched,
        } = self.matcher.resolve(query, &snapshot);
        trace.ok(Stage::Matched);
        debug!(
            "Matched={} score={} generation={}",
            matched,
            score,
            snapshot.generation()
        );

        let artifact = self
            .synthesizer
            .synthesize(&answer, self.artifacts.output_dir())
            .await
            .map_err(|e| trace.fail(Stage::Synthesized, e))?;
        if artifact.bytes_written {
            trace.ok(Stage::Synthesized);
        } else {
            trace.record(Stage::Synthesized, StageOutcome::Degraded("silent audio".into()));
        }

        let degraded = trace
            .records
            .iter()
            .any(|r| matches!(r.outcome, StageOutcome::Degraded(_)));

        Ok(QueryResponse {
            request_id: trace.request_id,
            kind,
            transcript,
            reply: answer,
            audio_url: format!(
                "{}/{}",
                self.audio_url_prefix.trim_end_matches('/'),
                artifact.file_name
            ),
            audio_file: artifact.file_name,
            matched,
            score,
            degraded,
            stages: Vec::new(),
        })
    }

    fn finish(mut trace: Trace, result: Result<QueryResponse>) -> Result<QueryResponse> {
        match result {
            Ok(mut response) => {
                trace.ok(Stage::Responded);
                response.stages = trace.records;
                Ok(response)
            }
            Err(e) => {
                trace.record(Stage::Responded, StageOutcome::Fatal(e.to_string()));
                Err(e)
            }
        }
    }

    /// Current operational state.
    pub fn info(&self) -> ServiceInfo {
        let snapshot = self.knowledge.current();
        ServiceInfo {
            status: "running",
            qa_pairs_loaded: snapshot.len(),
            version: env!("CARGO_PKG_VERSION"),
            generation: snapshot.generation(),
            loaded_at: snapshot.loaded_at(),
            knowledge_source: snapshot.origin().to_string(),
        }
    }

    /// Reload the knowledge base off the async workers.
    pub async fn reload_knowledge(&self) -> Result<Arc<KnowledgeSnapshot>> {
        let store = Arc::clone(&self.knowledge);
        tokio::task::spawn_blocking(move || store.reload())
            .await
            .map_err(|e| HarkError::Internal(format!("reload task failed: {e}")))
    }
}
