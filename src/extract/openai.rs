//! Structured extraction over the OpenAI `/chat/completions` endpoint.

use crate::error::{Result, VoxledgerError};
use crate::extract::extractor::Extractor;
use crate::extract::prompt::{InstructionTemplate, context_message};
use crate::openai::OpenAiClient;
use crate::timezone::CivilClock;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

const SERVICE: &str = "extraction";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completion extractor in JSON-object mode.
#[derive(Debug, Clone)]
pub struct OpenAiExtractor {
    client: OpenAiClient,
    model: String,
    instructions: Arc<InstructionTemplate>,
}

impl OpenAiExtractor {
    pub fn new(
        client: OpenAiClient,
        model: impl Into<String>,
        instructions: Arc<InstructionTemplate>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            instructions,
        }
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract(
        &self,
        transcript: &str,
        clock: &CivilClock,
        deadline: Instant,
    ) -> Result<String> {
        let key = self.client.credential(SERVICE)?;

        let context = context_message(&clock.name(), clock.today(), transcript);
        let payload = ChatRequest {
            model: &self.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: [
                ChatMessage {
                    role: "system",
                    content: self.instructions.as_str(),
                },
                ChatMessage {
                    role: "user",
                    content: &context,
                },
            ],
        };

        let request = self
            .client
            .http()
            .post(self.client.endpoint("/chat/completions"))
            .bearer_auth(key)
            .json(&payload);

        let body = self.client.send(SERVICE, request, deadline).await?;
        let parsed: ChatResponse =
            serde_json::from_slice(&body).map_err(|e| VoxledgerError::ServiceDecode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(VoxledgerError::NoCompletions)?;
        let content = choice.message.content.unwrap_or_default();
        tracing::debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;
    use std::time::Duration;

    #[test]
    fn request_body_shape() {
        let payload = ChatRequest {
            model: "gpt-4o-mini",
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "usr");
    }

    #[test]
    fn response_without_choices_decodes_empty() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn null_content_decodes_as_none() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let config = OpenAiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..OpenAiConfig::default()
        };
        let extractor = OpenAiExtractor::new(
            OpenAiClient::new(&config).unwrap(),
            "gpt-4o-mini",
            Arc::new(InstructionTemplate::embedded()),
        );
        let err = extractor
            .extract(
                "tea",
                &CivilClock::fixed_ist(),
                Instant::now() + Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VoxledgerError::MissingCredential {
                service: "extraction"
            }
        ));
    }
}
