//! Stage identities, tagged stage outcomes and the per-run trace.

use crate::pipeline::error::{ErrorKind, ParseFailure};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Steps of a parse run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingest,
    Transcribe,
    SkipTranscribe,
    RequireTranscript,
    Extract,
    DecodeJson,
    ResolveDate,
    Validate,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Transcribe => "transcribe",
            Stage::SkipTranscribe => "skip_transcribe",
            Stage::RequireTranscript => "require_transcript",
            Stage::Extract => "extract",
            Stage::DecodeJson => "decode_json",
            Stage::ResolveDate => "resolve_date",
            Stage::Validate => "validate",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage decided.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// Continue with this value.
    Advance(T),
    /// Continue with a substitute value after a recoverable problem.
    Fallback { value: T, reason: String },
    /// Stop the run.
    Abort(ParseFailure),
}

/// Recorded result of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Advanced,
    FellBack(String),
    Aborted(&'static str),
}

#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub elapsed: Duration,
}

impl StageRecord {
    /// Failure class of a problem the run absorbed at this stage.
    pub fn absorbed_failure(&self) -> Option<ErrorKind> {
        match (&self.status, self.stage) {
            (StageStatus::FellBack(_), Stage::Transcribe) => Some(ErrorKind::SoftServiceFailure),
            _ => None,
        }
    }
}

/// Ordered record of the stages a run went through.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    records: Vec<StageRecord>,
}

impl Trace {
    /// Record a stage outcome and turn it into control flow.
    pub fn settle<T>(
        &mut self,
        stage: Stage,
        started: Instant,
        outcome: StageOutcome<T>,
    ) -> Result<T, ParseFailure> {
        let elapsed = started.elapsed();
        let (status, result) = match outcome {
            StageOutcome::Advance(value) => {
                tracing::debug!(%stage, ?elapsed, "stage advanced");
                (StageStatus::Advanced, Ok(value))
            }
            StageOutcome::Fallback { value, reason } => {
                tracing::warn!(%stage, %reason, "stage fell back");
                (StageStatus::FellBack(reason), Ok(value))
            }
            StageOutcome::Abort(failure) => {
                if failure.status() >= 500 {
                    tracing::warn!(%stage, code = failure.code(), error = %failure, "run aborted");
                } else {
                    tracing::info!(%stage, code = failure.code(), error = %failure, "run aborted");
                }
                (StageStatus::Aborted(failure.code()), Err(failure))
            }
        };
        self.records.push(StageRecord {
            stage,
            status,
            elapsed,
        });
        result
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Stages in the order they ran.
    pub fn stages(&self) -> Vec<Stage> {
        self.records.iter().map(|r| r.stage).collect()
    }

    pub fn visited(&self, stage: Stage) -> bool {
        self.records.iter().any(|r| r.stage == stage)
    }

    pub fn status_of(&self, stage: Stage) -> Option<&StageStatus> {
        self.records
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    /// Problems absorbed along the way, in stage order.
    pub fn absorbed_failures(&self) -> Vec<(Stage, ErrorKind)> {
        self.records
            .iter()
            .filter_map(|r| r.absorbed_failure().map(|kind| (r.stage, kind)))
            .collect()
    }

    /// Wall time across all recorded stages.
    pub fn total(&self) -> Duration {
        self.records.iter().map(|r| r.elapsed).sum()
    }
}
