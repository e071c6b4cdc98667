//! voxledger - spoken or typed money notes to validated ledger entries
//!
//! Audio is transcribed, the transcript is turned into a structured entry by a
//! completion service, the date is repaired against the caller's zone, and the
//! result is checked against a JSON schema before it is returned.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod date;
pub mod defaults;
pub mod entry;
pub mod error;
pub mod extract;
pub mod openai;
pub mod pipeline;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;
pub mod stt;
pub mod timezone;

// Stage traits (transcript source → extraction)
pub use extract::{Extractor, MockExtractor};
pub use stt::{MockTranscriber, Transcriber};

// Pipeline
pub use pipeline::{ParseFailure, ParsePipeline, ParseRequest, ParsedEntry, PipelineConfig};

// Error handling
pub use error::{Result, VoxledgerError};

// Config
pub use config::Config;

pub use date::DateResolution;
pub use entry::ExtractedEntry;
pub use schema::{SchemaValidator, ValidationResult};
pub use timezone::CivilClock;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
