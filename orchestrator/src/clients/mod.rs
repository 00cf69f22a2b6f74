//! External capabilities the pipeline depends on.
//!
//! Each trait is the narrow seam between the pipeline and one provider. The
//! concrete clients in this module talk to Google Custom Search, Reddit and an
//! OpenAI-compatible chat endpoint; tests substitute in-memory doubles.

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::models::{SearchHit, ThreadContent};

pub mod google;
pub mod openai;
pub mod reddit;

pub use google::GoogleSearchClient;
pub use openai::OpenAiClient;
pub use reddit::RedditClient;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns up to `limit` results in ranking order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, UpstreamError>;
}

#[async_trait]
pub trait ForumClient: Send + Sync {
    async fn fetch_thread(&self, thread_id: &str) -> Result<ThreadContent, UpstreamError>;
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the generated text. An empty string means the provider answered
    /// without content.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, UpstreamError>;
}
