//! Parse pipeline: one request in, one validated entry or typed failure out.

use crate::config::Config;
use crate::date::{self, DateResolution};
use crate::defaults;
use crate::entry::ExtractedEntry;
use crate::error::Result;
use crate::extract::{Extractor, InstructionTemplate, OpenAiExtractor};
use crate::openai::OpenAiClient;
use crate::pipeline::error::ParseFailure;
use crate::pipeline::request::{AudioUpload, ParseRequest, ParsedEntry};
use crate::pipeline::stage::{Stage, StageOutcome, Trace};
use crate::schema::SchemaValidator;
use crate::stt::{OpenAiTranscriber, Transcriber};
use crate::timezone::{self, CivilClock};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Roughly thirty years.
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// Per-run policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Zone used when the request names none or names one that does not load.
    pub default_timezone: String,
    /// Audio above this many bytes is rejected before any external call.
    pub max_upload_bytes: u64,
    /// Budget shared by both external calls.
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_timezone: defaults::FALLBACK_TIMEZONE.to_string(),
            max_upload_bytes: defaults::MAX_UPLOAD_MB * defaults::BYTES_PER_MB,
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_timezone: config.parse.default_timezone.clone(),
            max_upload_bytes: config.server.max_upload_bytes(),
            request_timeout: config.server.request_timeout(),
        }
    }
}

/// Result of one run together with its stage trace.
#[derive(Debug)]
pub struct ParseRun {
    pub trace: Trace,
    pub outcome: std::result::Result<ParsedEntry, ParseFailure>,
}

impl ParseRun {
    pub fn into_result(self) -> std::result::Result<ParsedEntry, ParseFailure> {
        self.outcome
    }

    pub fn visited(&self, stage: Stage) -> bool {
        self.trace.visited(stage)
    }

    /// Whether the run only succeeded by absorbing a soft service failure.
    pub fn degraded(&self) -> bool {
        !self.trace.absorbed_failures().is_empty()
    }
}

/// Stages sequenced over shared, read-only collaborators.
#[derive(Clone)]
pub struct ParsePipeline {
    transcriber: Arc<dyn Transcriber>,
    extractor: Arc<dyn Extractor>,
    schema: Arc<SchemaValidator>,
    config: PipelineConfig,
}

impl std::fmt::Debug for ParsePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsePipeline")
            .field("transcriber", &self.transcriber.model_name())
            .field("extractor", &self.extractor.model_name())
            .field("schema", &self.schema.origin())
            .field("config", &self.config)
            .finish()
    }
}

impl ParsePipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        extractor: Arc<dyn Extractor>,
        schema: Arc<SchemaValidator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transcriber,
            extractor,
            schema,
            config,
        }
    }

    /// Build the production pipeline: OpenAI clients sharing one connection
    /// pool, instructions and schema loaded once.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OpenAiClient::new(&config.openai)?;
        let instructions = Arc::new(InstructionTemplate::load(
            config.parse.prompt_path.as_deref(),
        )?);
        let schema = Arc::new(SchemaValidator::load(config.parse.schema_path.as_deref())?);

        let transcriber = OpenAiTranscriber::new(client.clone(), &config.openai.whisper_model);
        let extractor = OpenAiExtractor::new(client, &config.openai.llm_model, instructions);

        if config.openai.api_key.trim().is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; every parse will fail until it is");
        }

        Ok(Self::new(
            Arc::new(transcriber),
            Arc::new(extractor),
            schema,
            PipelineConfig::from_config(config),
        ))
    }

    /// Replace the per-run budget shared by both external calls.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for one request.
    pub async fn run(&self, request: ParseRequest) -> ParseRun {
        let mut trace = Trace::default();
        let outcome = self.drive(request, &mut trace).await;
        match &outcome {
            Ok(entry) => tracing::info!(
                bytes = entry.json.len(),
                degraded = !trace.absorbed_failures().is_empty(),
                date = entry.date_resolution.as_str(),
                zone = %entry.timezone,
                elapsed = ?trace.total(),
                "entry parsed"
            ),
            Err(failure) => tracing::debug!(
                code = failure.code(),
                stages = trace.records().len(),
                "parse failed"
            ),
        }
        ParseRun { trace, outcome }
    }

    async fn drive(
        &self,
        request: ParseRequest,
        trace: &mut Trace,
    ) -> std::result::Result<ParsedEntry, ParseFailure> {
        let deadline = deadline_after(self.config.request_timeout);
        let clock = timezone::resolve(
            request.timezone.as_deref().unwrap_or_default(),
            &self.config.default_timezone,
        );

        let started = Instant::now();
        let audio = trace.settle(Stage::Ingest, started, self.ingest(request.audio))?;

        let started = Instant::now();
        let transcript = match audio {
            Some(upload) => trace.settle(
                Stage::Transcribe,
                started,
                self.transcribe(&upload, deadline).await,
            )?,
            None => trace.settle(
                Stage::SkipTranscribe,
                started,
                StageOutcome::Advance(String::new()),
            )?,
        };

        let started = Instant::now();
        let transcript = trace.settle(
            Stage::RequireTranscript,
            started,
            require_transcript(transcript, request.hint_text.as_deref()),
        )?;

        let started = Instant::now();
        let raw = trace.settle(
            Stage::Extract,
            started,
            self.extract(&transcript, &clock, deadline).await,
        )?;

        let started = Instant::now();
        let decoded = trace.settle(Stage::DecodeJson, started, decode(&raw, &transcript))?;

        let started = Instant::now();
        let (json, date_resolution) = trace.settle(
            Stage::ResolveDate,
            started,
            resolve_date(raw, decoded, &clock, &transcript),
        )?;

        let started = Instant::now();
        let json = trace.settle(
            Stage::Validate,
            started,
            self.validate(json, &transcript),
        )?;

        trace.settle(Stage::Done, Instant::now(), StageOutcome::Advance(()))?;
        Ok(ParsedEntry {
            json,
            transcript,
            date_resolution,
            timezone: clock.name().into_owned(),
        })
    }

    fn ingest(&self, audio: Option<AudioUpload>) -> StageOutcome<Option<AudioUpload>> {
        match audio {
            Some(upload) if upload.len() > self.config.max_upload_bytes => {
                StageOutcome::Abort(ParseFailure::UploadTooLarge {
                    size: upload.len(),
                    limit: self.config.max_upload_bytes,
                })
            }
            Some(upload) if upload.is_empty() => StageOutcome::Fallback {
                value: None,
                reason: "audio upload is empty".to_string(),
            },
            other => StageOutcome::Advance(other),
        }
    }

    async fn transcribe(&self, upload: &AudioUpload, deadline: Instant) -> StageOutcome<String> {
        let call = self
            .transcriber
            .transcribe(&upload.filename, &upload.bytes, deadline);
        match tokio::time::timeout_at(deadline, call).await {
            Ok(Ok(text)) => StageOutcome::Advance(text.trim().to_string()),
            Ok(Err(e)) if e.is_deadline() => StageOutcome::Abort(ParseFailure::Timeout {
                stage: Stage::Transcribe,
                transcript: None,
            }),
            Ok(Err(e)) => StageOutcome::Fallback {
                value: String::new(),
                reason: e.to_string(),
            },
            Err(_) => StageOutcome::Abort(ParseFailure::Timeout {
                stage: Stage::Transcribe,
                transcript: None,
            }),
        }
    }

    async fn extract(
        &self,
        transcript: &str,
        clock: &CivilClock,
        deadline: Instant,
    ) -> StageOutcome<String> {
        let timeout = || {
            StageOutcome::Abort(ParseFailure::Timeout {
                stage: Stage::Extract,
                transcript: Some(transcript.to_string()),
            })
        };
        if Instant::now() >= deadline {
            return timeout();
        }

        let call = self.extractor.extract(transcript, clock, deadline);
        match tokio::time::timeout_at(deadline, call).await {
            Ok(Ok(raw)) => StageOutcome::Advance(raw),
            Ok(Err(e)) if e.is_deadline() => timeout(),
            Ok(Err(e)) => StageOutcome::Abort(ParseFailure::ExtractionFailed {
                transcript: transcript.to_string(),
                source: e,
            }),
            Err(_) => timeout(),
        }
    }

    fn validate(&self, json: Vec<u8>, transcript: &str) -> StageOutcome<Vec<u8>> {
        match self.schema.validate(&json) {
            Ok(result) if result.valid => StageOutcome::Advance(json),
            Ok(result) => StageOutcome::Abort(ParseFailure::SchemaInvalid {
                transcript: transcript.to_string(),
                violations: result.violations,
            }),
            Err(e) => StageOutcome::Abort(ParseFailure::ValidationEngine {
                transcript: transcript.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Run deadline; a budget too large to represent saturates to a far-off instant.
fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget)
        .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

/// Transcript if non-blank, else the trimmed hint text.
fn require_transcript(transcript: String, hint_text: Option<&str>) -> StageOutcome<String> {
    let transcript = transcript.trim();
    if !transcript.is_empty() {
        return StageOutcome::Advance(transcript.to_string());
    }
    match hint_text.map(str::trim) {
        Some(hint) if !hint.is_empty() => StageOutcome::Fallback {
            value: hint.to_string(),
            reason: "no transcript, using hint_text".to_string(),
        },
        _ => StageOutcome::Abort(ParseFailure::NoInput),
    }
}

/// A completion object together with its typed view.
#[derive(Debug)]
struct Decoded {
    object: Map<String, Value>,
    entry: ExtractedEntry,
}

/// Completion text must be a JSON object whose known fields have the right types.
fn decode(raw: &str, transcript: &str) -> StageOutcome<Decoded> {
    let object: Map<String, Value> = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            return StageOutcome::Abort(ParseFailure::InvalidParseResponse {
                transcript: transcript.to_string(),
                message: format!("expected an object, got {}", json_type(&other)),
            });
        }
        Err(e) => {
            return StageOutcome::Abort(ParseFailure::InvalidParseResponse {
                transcript: transcript.to_string(),
                message: e.to_string(),
            });
        }
    };

    match ExtractedEntry::from_object(object.clone()) {
        Ok(entry) => StageOutcome::Advance(Decoded { object, entry }),
        Err(e) => StageOutcome::Abort(ParseFailure::SchemaInvalid {
            transcript: transcript.to_string(),
            violations: vec![e.to_string()],
        }),
    }
}

/// Repair the date; re-encode the completion object only when it changed.
fn resolve_date(
    raw: String,
    decoded: Decoded,
    clock: &CivilClock,
    transcript: &str,
) -> StageOutcome<(Vec<u8>, DateResolution)> {
    let Decoded { mut object, mut entry } = decoded;
    let resolution = date::ensure_date(&mut entry, clock);
    if !resolution.mutated() {
        return StageOutcome::Advance((raw.into_bytes(), resolution));
    }
    let today = entry.date.unwrap_or_default();
    tracing::debug!(reason = resolution.as_str(), date = %today, "date replaced");
    object.insert("date".to_string(), Value::String(today));
    match serde_json::to_vec(&object) {
        Ok(json) => StageOutcome::Advance((json, resolution)),
        Err(e) => StageOutcome::Abort(ParseFailure::SerializationFailed {
            transcript: transcript.to_string(),
            message: e.to_string(),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
