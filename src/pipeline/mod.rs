//! Transcript-to-entry parse pipeline.
//!
//! `Ingest → (Transcribe | SkipTranscribe) → RequireTranscript → Extract →
//! DecodeJson → ResolveDate → Validate → Done`. Each stage returns a
//! [`StageOutcome`]; the run records every outcome in a [`Trace`].

pub mod error;
pub mod orchestrator;
pub mod request;
pub mod stage;

pub use error::{ErrorKind, FailureBody, ParseFailure};
pub use orchestrator::{ParsePipeline, ParseRun, PipelineConfig};
pub use request::{AudioUpload, ParseRequest, ParsedEntry};
pub use stage::{Stage, StageOutcome, StageRecord, StageStatus, Trace};
