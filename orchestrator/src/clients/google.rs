use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::SearchProvider;
use crate::error::UpstreamError;
use crate::models::SearchHit;

const SERVICE: &str = "google search";

/// Custom Search returns at most ten results per call.
const MAX_RESULTS_PER_CALL: usize = 10;

/// Error reasons Google reports for an unusable API key.
const KEY_REJECTION_REASONS: &[&str] = &["keyInvalid", "API_KEY_INVALID", "keyExpired", "API_KEY_EXPIRED"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    // Absent when the query matched nothing.
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
}

impl SearchResponse {
    fn into_hits(self) -> Vec<SearchHit> {
        self.items
            .into_iter()
            .filter_map(|item| item.link)
            .map(SearchHit::new)
            .collect()
    }
}

#[derive(Clone)]
pub struct GoogleSearchClient {
    client: Client,
    api_key: String,
    engine_id: String,
    base_url: String,
}

impl GoogleSearchClient {
    pub fn new(client: Client, api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            base_url: "https://www.googleapis.com".to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, UpstreamError> {
        let num = limit.clamp(1, MAX_RESULTS_PER_CALL).to_string();

        let response = self
            .client
            .get(format!("{}/customsearch/v1", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Google search request failed");
                UpstreamError::transport(SERVICE, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "Google search API error");
            return Err(classify_error(status, body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::malformed(SERVICE, e.to_string()))?;

        let hits = parsed.into_hits();
        debug!(results = hits.len(), "Google search completed");
        Ok(hits)
    }
}

/// Google answers a bad key with 400 and a forbidden or disabled key with 403.
fn classify_error(status: StatusCode, body: String) -> UpstreamError {
    let rejected = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => true,
        StatusCode::BAD_REQUEST => error_reasons(&body)
            .iter()
            .any(|reason| KEY_REJECTION_REASONS.contains(&reason.as_str())),
        _ => false,
    };

    if rejected {
        UpstreamError::rejected_credentials(SERVICE, status, &body)
    } else {
        UpstreamError::from_status(SERVICE, status, body)
    }
}

/// Collects `error.errors[].reason` and `error.details[].reason` from an error body.
fn error_reasons(body: &str) -> Vec<String> {
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };

    ["errors", "details"]
        .iter()
        .filter_map(|key| payload["error"][*key].as_array())
        .flatten()
        .filter_map(|entry| entry["reason"].as_str())
        .map(String::from)
        .collect()
}
