//! In-memory doubles for the external capabilities.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::{CompletionRequest, ForumClient, LanguageModel, SearchProvider};
use crate::error::UpstreamError;
use crate::models::{Comment, SearchHit, ThreadContent};

/// Search double returning a fixed result list (or a fixed error) for every query.
pub struct MockSearch {
    response: Result<Vec<SearchHit>, UpstreamError>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockSearch {
    pub fn with_links(links: &[&str]) -> Self {
        Self {
            response: Ok(links.iter().map(|l| SearchHit::new(*l)).collect()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn failing(err: UpstreamError) -> Self {
        Self {
            response: Err(err),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, UpstreamError> {
        self.calls.lock().unwrap().push((query.to_string(), limit));
        self.response
            .clone()
            .map(|mut hits| {
                hits.truncate(limit);
                hits
            })
    }
}

/// Forum double keyed by thread id. Unknown ids answer 404.
#[derive(Default)]
pub struct MockForum {
    threads: HashMap<String, Result<ThreadContent, UpstreamError>>,
    delays: HashMap<String, Duration>,
    fetched: Mutex<Vec<String>>,
}

impl MockForum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread(mut self, id: &str, thread: ThreadContent) -> Self {
        self.threads.insert(id.to_string(), Ok(thread));
        self
    }

    pub fn failing(mut self, id: &str, err: UpstreamError) -> Self {
        self.threads.insert(id.to_string(), Err(err));
        self
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForumClient for MockForum {
    async fn fetch_thread(&self, thread_id: &str) -> Result<ThreadContent, UpstreamError> {
        if let Some(delay) = self.delays.get(thread_id) {
            tokio::time::sleep(*delay).await;
        }
        self.fetched.lock().unwrap().push(thread_id.to_string());

        self.threads.get(thread_id).cloned().unwrap_or_else(|| {
            Err(UpstreamError::Status {
                service: "reddit",
                status: 404,
                body: "not found".to_string(),
            })
        })
    }
}

/// A thread whose title is used by [`MockModel`] rules to tell prompts apart.
pub fn thread(title: &str, comments: &[(&str, i64)]) -> ThreadContent {
    ThreadContent {
        title: title.to_string(),
        body: None,
        permalink: String::new(),
        comments: Some(
            comments
                .iter()
                .map(|(body, score)| Comment {
                    body: body.to_string(),
                    score: Some(*score),
                })
                .collect(),
        ),
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Model double answering by the first rule whose needle occurs in the prompt.
#[derive(Default)]
pub struct MockModel {
    rules: Vec<(String, Result<String, UpstreamError>)>,
    fallback: Option<Result<String, UpstreamError>>,
    calls: Mutex<Vec<RecordedCompletion>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_when(mut self, needle: &str, text: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(text.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str, err: UpstreamError) -> Self {
        self.rules.push((needle.to_string(), Err(err)));
        self
    }

    pub fn respond_default(mut self, text: &str) -> Self {
        self.fallback = Some(Ok(text.to_string()));
        self
    }

    pub fn fail_default(mut self, err: UpstreamError) -> Self {
        self.fallback = Some(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCompletion> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, UpstreamError> {
        self.calls.lock().unwrap().push(RecordedCompletion {
            prompt: request.prompt.to_string(),
            model: request.model.to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        });

        self.rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Ok(String::new()))
    }
}

pub fn auth_error(service: &'static str) -> UpstreamError {
    UpstreamError::Auth {
        service,
        message: "HTTP 401: invalid credentials".to_string(),
    }
}
