//! Data passed into and out of a parse run.

use crate::date::DateResolution;

/// An uploaded audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    /// Name supplied by the client; used for format detection upstream.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One parse request. At least one of audio or hint text must yield text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseRequest {
    pub audio: Option<AudioUpload>,
    pub hint_text: Option<String>,
    /// IANA zone requested by the caller; the configured default applies when absent.
    pub timezone: Option<String>,
}

impl ParseRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.audio = Some(AudioUpload::new(filename, bytes));
        self
    }

    pub fn with_hint_text(mut self, text: impl Into<String>) -> Self {
        self.hint_text = Some(text.into());
        self
    }

    pub fn with_timezone(mut self, zone: impl Into<String>) -> Self {
        self.timezone = Some(zone.into());
        self
    }
}

/// A validated entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    /// Exactly the bytes that passed validation.
    pub json: Vec<u8>,
    pub transcript: String,
    pub date_resolution: DateResolution,
    /// Name of the zone the run resolved to.
    pub timezone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let request = ParseRequest::new()
            .with_audio("memo.m4a", vec![1, 2, 3])
            .with_hint_text("tea 20")
            .with_timezone("Europe/Berlin");

        let audio = request.audio.as_ref().unwrap();
        assert_eq!(audio.filename, "memo.m4a");
        assert_eq!(audio.len(), 3);
        assert_eq!(request.hint_text.as_deref(), Some("tea 20"));
        assert_eq!(request.timezone.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn empty_upload() {
        assert!(AudioUpload::new("a.wav", Vec::new()).is_empty());
    }
}
