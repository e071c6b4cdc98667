//! Typed failures of a parse run and their wire representation.

use crate::error::VoxledgerError;
use crate::pipeline::stage::Stage;
use serde::Serialize;
use thiserror::Error;

/// Coarse failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transcription failed and the run continued on hint text. Reported by
    /// [`Trace::absorbed_failures`](crate::pipeline::Trace::absorbed_failures),
    /// never by [`ParseFailure::kind`].
    SoftServiceFailure,
    /// The request itself is unusable.
    InputError,
    /// The completion service failed.
    HardServiceFailure,
    /// The completion did not produce a JSON object.
    MalformedOutput,
    /// The entry does not satisfy the schema.
    ValidationFailure,
    /// Encoding or engine failure on our side.
    Internal,
    /// The request deadline expired.
    Timeout,
}

/// Terminal failure of one parse run.
#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error("request body could not be read: {message}")]
    MalformedForm { message: String },

    #[error("no audio or hint_text provided")]
    NoInput,

    #[error("audio upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: u64, limit: u64 },

    #[error("request body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: u64 },

    #[error("deadline expired during {stage}")]
    Timeout {
        stage: Stage,
        transcript: Option<String>,
    },

    #[error("extraction failed: {source}")]
    ExtractionFailed {
        transcript: String,
        #[source]
        source: VoxledgerError,
    },

    #[error("completion is not a JSON object: {message}")]
    InvalidParseResponse { transcript: String, message: String },

    #[error("entry could not be re-encoded: {message}")]
    SerializationFailed { transcript: String, message: String },

    #[error("entry violates the schema ({} violations)", violations.len())]
    SchemaInvalid {
        transcript: String,
        violations: Vec<String>,
    },

    #[error("schema engine failed: {message}")]
    ValidationEngine { transcript: String, message: String },
}

/// JSON body returned for a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ParseFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseFailure::MalformedForm { .. }
            | ParseFailure::NoInput
            | ParseFailure::UploadTooLarge { .. }
            | ParseFailure::BodyTooLarge { .. } => ErrorKind::InputError,
            ParseFailure::Timeout { .. } => ErrorKind::Timeout,
            ParseFailure::ExtractionFailed { .. } => ErrorKind::HardServiceFailure,
            ParseFailure::InvalidParseResponse { .. } => ErrorKind::MalformedOutput,
            ParseFailure::SchemaInvalid { .. } => ErrorKind::ValidationFailure,
            ParseFailure::SerializationFailed { .. } | ParseFailure::ValidationEngine { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Machine-readable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ParseFailure::MalformedForm { .. } => "invalid multipart body",
            ParseFailure::NoInput => "no audio or hint_text provided",
            ParseFailure::UploadTooLarge { .. } | ParseFailure::BodyTooLarge { .. } => {
                "file too large"
            }
            ParseFailure::Timeout { .. } => "timeout",
            ParseFailure::ExtractionFailed { .. } => "could_not_parse",
            ParseFailure::InvalidParseResponse { .. } => "invalid_parse_response",
            ParseFailure::SerializationFailed { .. } => "serialization_failed",
            ParseFailure::SchemaInvalid { .. } => "schema_invalid",
            ParseFailure::ValidationEngine { .. } => "validation_failed",
        }
    }

    /// HTTP status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            ParseFailure::MalformedForm { .. } | ParseFailure::NoInput => 400,
            ParseFailure::UploadTooLarge { .. } | ParseFailure::BodyTooLarge { .. } => 413,
            ParseFailure::ExtractionFailed { .. } | ParseFailure::SchemaInvalid { .. } => 422,
            ParseFailure::InvalidParseResponse { .. }
            | ParseFailure::SerializationFailed { .. }
            | ParseFailure::ValidationEngine { .. } => 500,
            ParseFailure::Timeout { .. } => 504,
        }
    }

    /// Transcript obtained before the failure, if any.
    pub fn transcript(&self) -> Option<&str> {
        match self {
            ParseFailure::MalformedForm { .. }
            | ParseFailure::NoInput
            | ParseFailure::UploadTooLarge { .. }
            | ParseFailure::BodyTooLarge { .. } => None,
            ParseFailure::Timeout { transcript, .. } => transcript.as_deref(),
            ParseFailure::ExtractionFailed { transcript, .. }
            | ParseFailure::InvalidParseResponse { transcript, .. }
            | ParseFailure::SerializationFailed { transcript, .. }
            | ParseFailure::SchemaInvalid { transcript, .. }
            | ParseFailure::ValidationEngine { transcript, .. } => Some(transcript),
        }
    }

    /// Schema violations, for `schema_invalid` only.
    pub fn details(&self) -> Option<&[String]> {
        match self {
            ParseFailure::SchemaInvalid { violations, .. } => Some(violations),
            _ => None,
        }
    }

    pub fn to_body(&self) -> FailureBody {
        FailureBody {
            error: self.code(),
            transcript: self.transcript().map(str::to_string),
            details: self.details().map(<[String]>::to_vec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_failures() -> Vec<ParseFailure> {
        vec![
            ParseFailure::MalformedForm {
                message: "boundary".into(),
            },
            ParseFailure::NoInput,
            ParseFailure::UploadTooLarge { size: 20, limit: 10 },
            ParseFailure::BodyTooLarge { limit: 10 },
            ParseFailure::Timeout {
                stage: Stage::Extract,
                transcript: Some("t".into()),
            },
            ParseFailure::ExtractionFailed {
                transcript: "t".into(),
                source: VoxledgerError::NoCompletions,
            },
            ParseFailure::InvalidParseResponse {
                transcript: "t".into(),
                message: "eof".into(),
            },
            ParseFailure::SerializationFailed {
                transcript: "t".into(),
                message: "x".into(),
            },
            ParseFailure::SchemaInvalid {
                transcript: "t".into(),
                violations: vec!["\"title\" is a required property".into()],
            },
            ParseFailure::ValidationEngine {
                transcript: "t".into(),
                message: "x".into(),
            },
        ]
    }

    #[test]
    fn status_codes() {
        let statuses: Vec<u16> = all_failures().iter().map(ParseFailure::status).collect();
        assert_eq!(statuses, vec![400, 400, 413, 413, 504, 422, 500, 500, 422, 500]);
    }

    #[test]
    fn post_transcript_failures_carry_transcript() {
        for failure in all_failures() {
            let expects = !matches!(failure.kind(), ErrorKind::InputError);
            assert_eq!(failure.transcript().is_some(), expects, "{failure:?}");
        }
    }

    #[test]
    fn no_input_body() {
        let body = serde_json::to_value(ParseFailure::NoInput.to_body()).unwrap();
        assert_eq!(body, json!({"error": "no audio or hint_text provided"}));
    }

    #[test]
    fn schema_invalid_body_has_details_and_transcript() {
        let failure = ParseFailure::SchemaInvalid {
            transcript: "coffee".into(),
            violations: vec!["a".into(), "b".into()],
        };
        let body = serde_json::to_value(failure.to_body()).unwrap();
        assert_eq!(
            body,
            json!({"error": "schema_invalid", "transcript": "coffee", "details": ["a", "b"]})
        );
    }

    #[test]
    fn could_not_parse_keeps_source() {
        let failure = ParseFailure::ExtractionFailed {
            transcript: "x".into(),
            source: VoxledgerError::NoCompletions,
        };
        let source = std::error::Error::source(&failure).unwrap();
        assert!(source.to_string().contains("no choices"));
        assert_eq!(failure.kind(), ErrorKind::HardServiceFailure);
    }
}
