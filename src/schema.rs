//! Schema gate for extracted entries.
//!
//! The schema document is compiled once at startup and shared read-only by
//! every request.

use crate::error::{Result, VoxledgerError};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Contract shipped with the crate, used when no schema path is configured.
pub const EMBEDDED_SCHEMA: &str = include_str!("../schemas/expense_entry.schema.json");

/// Outcome of checking one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    /// Human-readable violations, in the order the engine reported them.
    pub violations: Vec<String>,
}

impl ValidationResult {
    fn from_violations(violations: Vec<String>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

/// The engine could not run at all; distinct from a failed validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("payload is not readable JSON: {0}")]
    UnreadablePayload(#[from] serde_json::Error),
}

/// Compiled schema contract.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
    origin: String,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compile a schema document. `origin` names it in errors and logs.
    pub fn compile(document: &str, origin: &str) -> Result<Self> {
        let schema: Value =
            serde_json::from_str(document).map_err(|e| VoxledgerError::SchemaLoad {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| VoxledgerError::SchemaCompile {
                message: format!("{origin}: {e}"),
            })?;
        Ok(Self {
            validator,
            origin: origin.to_string(),
        })
    }

    /// The schema shipped with the crate.
    pub fn embedded() -> Result<Self> {
        Self::compile(EMBEDDED_SCHEMA, "embedded:expense_entry.schema.json")
    }

    /// Read and compile a schema file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let document = fs::read_to_string(path).map_err(|e| VoxledgerError::SchemaLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::compile(&document, &path.display().to_string())
    }

    /// Configured file if given, embedded schema otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let validator = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::embedded()?,
        };
        tracing::info!(origin = %validator.origin, "entry schema compiled");
        Ok(validator)
    }

    /// Where the schema came from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Check raw JSON bytes against the contract.
    pub fn validate(&self, json: &[u8]) -> std::result::Result<ValidationResult, SchemaError> {
        let instance: Value = serde_json::from_slice(json)?;
        Ok(self.validate_value(&instance))
    }

    /// Check an already-parsed value against the contract.
    pub fn validate_value(&self, instance: &Value) -> ValidationResult {
        let violations = self
            .validator
            .iter_errors(instance)
            .map(|error| error.to_string())
            .collect();
        ValidationResult::from_violations(violations)
    }
}
