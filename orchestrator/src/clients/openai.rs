use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{CompletionRequest, LanguageModel};
use crate::error::UpstreamError;

const SERVICE: &str = "openai";

/// Chat-completions client for OpenAI or any compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Set a custom base URL (for Azure, proxies, local servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, UpstreamError> {
        let start = std::time::Instant::now();

        let body = json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                UpstreamError::transport(SERVICE, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(classify_error(status, error_text));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::malformed(SERVICE, e.to_string()))?;

        debug!(
            model = request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );

        Ok(message_content(&payload))
    }
}

/// A revoked key answers 401; a key without access to the model or project answers 403.
fn classify_error(status: StatusCode, body: String) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            UpstreamError::rejected_credentials(SERVICE, status, &body)
        }
        _ => UpstreamError::from_status(SERVICE, status, body),
    }
}

fn message_content(payload: &Value) -> String {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
