// Synthesizer Agent: merges relevant thread summaries into one answer

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::clients::{CompletionRequest, LanguageModel};
use crate::config::StageSettings;
use crate::error::UpstreamError;
use crate::models::ThreadSummary;

pub const SYNTHESIS_FAILURE_MESSAGE: &str = "Error occurred while synthesizing the final answer.";

pub struct SynthesizerAgent {
    llm: Arc<dyn LanguageModel>,
    model: String,
    settings: StageSettings,
}

impl SynthesizerAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, model: impl Into<String>, settings: StageSettings) -> Self {
        Self {
            llm,
            model: model.into(),
            settings,
        }
    }

    /// Falls back to [`SYNTHESIS_FAILURE_MESSAGE`] on any failure except a
    /// credential rejection, which is returned to the caller.
    pub async fn synthesize(
        &self,
        query: &str,
        summaries: &[ThreadSummary],
    ) -> Result<String, UpstreamError> {
        info!(summaries = summaries.len(), "Synthesizer: Building final answer");

        let prompt = build_synthesis_prompt(query, summaries);
        let result = self
            .llm
            .complete(CompletionRequest {
                prompt: &prompt,
                model: &self.model,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            })
            .await;

        match result {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => {
                warn!(stage = super::SYNTHESIZE_STAGE, "Synthesizer: Empty model response");
                Ok(SYNTHESIS_FAILURE_MESSAGE.to_string())
            }
            Err(e) if e.is_auth() => Err(e),
            Err(e) => {
                error!(stage = super::SYNTHESIZE_STAGE, error = %e, "Synthesizer: Model call failed");
                Ok(SYNTHESIS_FAILURE_MESSAGE.to_string())
            }
        }
    }
}

pub fn build_synthesis_prompt(query: &str, summaries: &[ThreadSummary]) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Question: {}\n", query);
    prompt.push_str("Findings from Reddit discussions:\n\n");
    for (index, summary) in summaries.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "Summary {} (Source: {}):\n{}\n",
            index + 1,
            summary.source_link,
            summary.summary
        );
    }

    prompt.push_str(
        "Using the findings above, write one cohesive, direct answer to the question in \
         Markdown. Do not mention summaries, findings, sources being combined, or how the \
         answer was produced; answer as if you knew it yourself. When several products, \
         places or options are recommended, group them in a list with a short reason for \
         each. Keep it concise.",
    );

    prompt
}
