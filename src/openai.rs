//! Shared plumbing for the OpenAI-compatible HTTP API.
//!
//! One `reqwest::Client` (and its connection pool) is built at startup and
//! cloned into every service client; clones share the pool.

use crate::config::OpenAiConfig;
use crate::error::{Result, VoxledgerError};
use std::time::Duration;
use tokio::time::Instant;

/// Connection pool, endpoint and credential for the upstream API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Build a client with a fresh connection pool.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("voxledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VoxledgerError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_http(http, config))
    }

    /// Build a client around an existing pool.
    pub fn with_http(http: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for an API path such as `/chat/completions`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// API key, or a configuration error before any network traffic.
    pub(crate) fn credential(&self, service: &'static str) -> Result<&str> {
        if self.api_key.is_empty() {
            Err(VoxledgerError::MissingCredential { service })
        } else {
            Ok(&self.api_key)
        }
    }

    /// Send a request, map transport failures and non-success statuses,
    /// and return the response body.
    pub(crate) async fn send(
        &self,
        service: &'static str,
        request: reqwest::RequestBuilder,
        deadline: Instant,
    ) -> Result<Vec<u8>> {
        let response = request
            .timeout(remaining(service, deadline)?)
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(service, e))?;

        if !status.is_success() {
            return Err(VoxledgerError::ServiceStatus {
                service,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }
}

/// Time left before `deadline`; an already expired deadline is an error.
pub(crate) fn remaining(service: &'static str, deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        Err(VoxledgerError::DeadlineExceeded { service })
    } else {
        Ok(left)
    }
}

fn transport_error(service: &'static str, error: reqwest::Error) -> VoxledgerError {
    if error.is_timeout() {
        VoxledgerError::DeadlineExceeded { service }
    } else if error.is_decode() {
        VoxledgerError::ServiceDecode {
            service,
            message: error.to_string(),
        }
    } else {
        VoxledgerError::ServiceTransport {
            service,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, api_key: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            ..OpenAiConfig::default()
        }
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = OpenAiClient::new(&config("http://localhost:4010/v1/", "k")).unwrap();
        assert_eq!(
            client.endpoint("/chat/completions"),
            "http://localhost:4010/v1/chat/completions"
        );
    }

    #[test]
    fn blank_key_is_missing_credential() {
        let client = OpenAiClient::new(&config("http://localhost", "  ")).unwrap();
        let err = client.credential("transcription").unwrap_err();
        assert!(matches!(
            err,
            VoxledgerError::MissingCredential {
                service: "transcription"
            }
        ));
    }

    #[test]
    fn present_key_is_returned_trimmed() {
        let client = OpenAiClient::new(&config("http://localhost", " sk-abc ")).unwrap();
        assert_eq!(client.credential("extraction").unwrap(), "sk-abc");
    }

    #[tokio::test]
    async fn expired_deadline_has_no_budget() {
        let past = Instant::now() - Duration::from_millis(1);
        assert!(remaining("extraction", past).unwrap_err().is_deadline());

        let future = Instant::now() + Duration::from_secs(5);
        assert!(remaining("extraction", future).unwrap() > Duration::from_secs(4));
    }
}
