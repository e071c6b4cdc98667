//! Instruction template and per-request context message.

use crate::error::{Result, VoxledgerError};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

/// Instructions shipped with the crate.
pub const EMBEDDED_INSTRUCTIONS: &str = include_str!("../../prompts/extraction.txt");

/// Fixed system instructions for the completion service, loaded once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    text: String,
}

impl InstructionTemplate {
    pub fn embedded() -> Self {
        Self {
            text: EMBEDDED_INSTRUCTIONS.trim().to_string(),
        }
    }

    /// Read instructions from a file. An empty file is rejected.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| VoxledgerError::PromptLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(VoxledgerError::PromptLoad {
                path: path.display().to_string(),
                message: "file is empty".to_string(),
            });
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    /// Configured file if given, embedded instructions otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let template = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::embedded(),
        };
        tracing::info!(
            source = path.map_or("embedded".into(), |p| p.display().to_string()),
            chars = template.text.len(),
            "instruction template loaded"
        );
        Ok(template)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// User message carrying zone, date and transcript.
pub fn context_message(zone: &str, today: NaiveDate, transcript: &str) -> String {
    format!(
        "Context: Timezone is {zone}. Today is {}.\nText: {transcript}",
        today.format(crate::defaults::DATE_FORMAT)
    )
}
