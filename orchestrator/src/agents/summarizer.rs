// Summarizer Agent: condenses one thread into a short answer-focused summary

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use super::retriever::thread_link;
use crate::clients::{CompletionRequest, LanguageModel};
use crate::config::StageSettings;
use crate::error::UpstreamError;
use crate::models::{ThreadExcerpt, ThreadSummary};

const MAX_BODY_CHARS: usize = 2_000;
const MAX_COMMENT_CHARS: usize = 1_000;

pub struct SummarizerAgent {
    llm: Arc<dyn LanguageModel>,
    model: String,
    settings: StageSettings,
}

impl SummarizerAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, model: impl Into<String>, settings: StageSettings) -> Self {
        Self {
            llm,
            model: model.into(),
            settings,
        }
    }

    /// `Ok(None)` when the model answered with nothing.
    pub async fn summarize(
        &self,
        query: &str,
        thread_id: &str,
        excerpt: &ThreadExcerpt,
    ) -> Result<Option<ThreadSummary>, UpstreamError> {
        info!(thread_id, "Summarizer: Summarizing thread");

        let prompt = build_summary_prompt(query, excerpt);
        let response = self
            .llm
            .complete(CompletionRequest {
                prompt: &prompt,
                model: &self.model,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            })
            .await?;

        let summary = response.trim();
        if summary.is_empty() {
            info!(thread_id, "Summarizer: Empty model response, skipping");
            return Ok(None);
        }

        debug!(thread_id, chars = summary.len(), "Summarizer: Summary produced");
        Ok(Some(ThreadSummary {
            summary: summary.to_string(),
            source_link: thread_link(thread_id),
        }))
    }
}

pub fn build_summary_prompt(query: &str, excerpt: &ThreadExcerpt) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are reading a Reddit discussion to help answer a user's question.\n\n",
    );
    let _ = writeln!(prompt, "Question: {}\n", query);
    let _ = writeln!(prompt, "Thread title: {}", excerpt.title);
    if let Some(body) = excerpt.body.as_deref() {
        let _ = writeln!(prompt, "Thread body: {}", truncate_chars(body, MAX_BODY_CHARS));
    }

    prompt.push_str("\nTop comments:\n");
    for (index, comment) in excerpt.comments.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. {}",
            index + 1,
            truncate_chars(comment.body.trim(), MAX_COMMENT_CHARS)
        );
    }

    prompt.push_str(
        "\nSummarize only the parts of this discussion that answer the question, in at most \
         three sentences. Mention specific recommendations, names or numbers when the \
         commenters give them. If the discussion does not pertain to the question, reply \
         with one sentence stating that the thread is not about the question and does not \
         provide any information to answer it.",
    );

    prompt
}

/// Cuts `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}
