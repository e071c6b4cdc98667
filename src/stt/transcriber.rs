use crate::error::{Result, VoxledgerError};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (remote service vs mock).
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an uploaded audio file to text.
    ///
    /// # Arguments
    /// * `filename` - Original upload name; the service uses its extension to detect the format
    /// * `audio` - Raw file bytes as uploaded
    /// * `deadline` - Instant after which the call must give up
    ///
    /// # Returns
    /// Trimmed transcribed text or error
    async fn transcribe(&self, filename: &str, audio: &[u8], deadline: Instant) -> Result<String>;

    /// Get the name of the configured model
    fn model_name(&self) -> &str;
}

/// Implement Transcriber for Arc<T> to allow sharing across requests.
#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    async fn transcribe(&self, filename: &str, audio: &[u8], deadline: Instant) -> Result<String> {
        (**self).transcribe(filename, audio, deadline).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail like a service answering 500
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to take this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of transcribe calls made so far (shared between clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        _filename: &str,
        _audio: &[u8],
        deadline: Instant,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay
            && tokio::time::timeout_at(deadline, tokio::time::sleep(delay))
                .await
                .is_err()
        {
            return Err(VoxledgerError::DeadlineExceeded {
                service: "mock transcription",
            });
        }
        if self.should_fail {
            Err(VoxledgerError::ServiceStatus {
                service: "mock transcription",
                status: 500,
                body: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.trim().to_string())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
