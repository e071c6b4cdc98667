//! Extractor trait for transcript-to-record completion.

use crate::error::{Result, VoxledgerError};
use crate::timezone::CivilClock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Trait for structured extraction from a transcript.
///
/// Implementations return the completion's JSON text verbatim; decoding and
/// validation happen downstream.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Ask for a structured entry describing `transcript`.
    ///
    /// `clock` supplies the zone name and today's date sent as context.
    async fn extract(&self, transcript: &str, clock: &CivilClock, deadline: Instant)
    -> Result<String>;

    /// Return the name of the configured model for logging.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: Extractor + ?Sized> Extractor for Arc<T> {
    async fn extract(
        &self,
        transcript: &str,
        clock: &CivilClock,
        deadline: Instant,
    ) -> Result<String> {
        (**self).extract(transcript, clock, deadline).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockFailure {
    Status,
    NoChoices,
}

/// Mock extractor for testing
#[derive(Debug, Clone)]
pub struct MockExtractor {
    model_name: String,
    response: String,
    failure: Option<MockFailure>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    transcripts: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    /// Create a mock that answers with an empty JSON object
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "{}".to_string(),
            failure: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            transcripts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer with this completion text
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Fail like a service answering 500
    pub fn with_failure(mut self) -> Self {
        self.failure = Some(MockFailure::Status);
        self
    }

    /// Fail like a service answering with zero choices
    pub fn with_no_choices(mut self) -> Self {
        self.failure = Some(MockFailure::NoChoices);
        self
    }

    /// Take this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of extract calls made so far (shared between clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Transcripts received, in call order
    pub fn transcripts(&self) -> Vec<String> {
        self.transcripts
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        transcript: &str,
        _clock: &CivilClock,
        deadline: Instant,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.transcripts.lock() {
            seen.push(transcript.to_string());
        }

        if let Some(delay) = self.delay
            && tokio::time::timeout_at(deadline, tokio::time::sleep(delay))
                .await
                .is_err()
        {
            return Err(VoxledgerError::DeadlineExceeded {
                service: "mock extraction",
            });
        }

        match self.failure {
            Some(MockFailure::Status) => Err(VoxledgerError::ServiceStatus {
                service: "mock extraction",
                status: 500,
                body: "mock extraction failure".to_string(),
            }),
            Some(MockFailure::NoChoices) => Err(VoxledgerError::NoCompletions),
            None => Ok(self.response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
