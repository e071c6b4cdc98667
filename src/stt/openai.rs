//! Speech-to-text over the OpenAI `/audio/transcriptions` endpoint.

use crate::error::{Result, VoxledgerError};
use crate::openai::OpenAiClient;
use crate::stt::transcriber::Transcriber;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::time::Instant;

const SERVICE: &str = "transcription";

/// Name sent when the upload carried none.
const FALLBACK_FILENAME: &str = "audio";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Remote Whisper-style transcriber.
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    client: OpenAiClient,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, filename: &str, audio: &[u8], deadline: Instant) -> Result<String> {
        let key = self.client.credential(SERVICE)?;

        let filename = if filename.trim().is_empty() {
            FALLBACK_FILENAME
        } else {
            filename
        };
        let form = Form::new()
            .part("file", Part::bytes(audio.to_vec()).file_name(filename.to_string()))
            .text("model", self.model.clone());

        let request = self
            .client
            .http()
            .post(self.client.endpoint("/audio/transcriptions"))
            .bearer_auth(key)
            .multipart(form);

        let body = self.client.send(SERVICE, request, deadline).await?;
        let parsed: TranscriptionResponse =
            serde_json::from_slice(&body).map_err(|e| VoxledgerError::ServiceDecode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        tracing::debug!(
            model = %self.model,
            bytes = audio.len(),
            chars = parsed.text.len(),
            "audio transcribed"
        );
        Ok(parsed.text.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
