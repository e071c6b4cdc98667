//! Typed view of the record produced by the extraction stage.
//!
//! Every field is optional and unknown keys land in `extra`, so a partial or
//! over-eager completion still decodes. A known field with the wrong JSON type
//! is a decode error. The view is read-only: the pipeline edits and re-encodes
//! the decoded JSON object itself, so explicit `null`s reach the schema check.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

/// One candidate ledger entry.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ExtractedEntry {
    #[serde(default)]
    pub title: Option<String>,
    /// `expense` or `income`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<Number>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Payment mode (cash, card, upi, ...).
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Non-string values decode as absent; the date resolver repairs them.
    #[serde(default, deserialize_with = "string_or_absent")]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub needs_confirmation: Option<NeedsConfirmation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-field markers set when the completion could not fill a field confidently.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct NeedsConfirmation {
    #[serde(default)]
    pub date: Option<bool>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

fn string_or_absent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl ExtractedEntry {
    /// Decode from an already-parsed JSON object.
    pub fn from_object(object: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(object))
    }

    /// Whether the completion asked for the date to be confirmed.
    pub fn date_needs_confirmation(&self) -> bool {
        self.needs_confirmation
            .as_ref()
            .and_then(|nc| nc.date)
            .unwrap_or(false)
    }
}
