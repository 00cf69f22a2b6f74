//! Question answering pipeline.
//!
//! ```text
//! discover ──(no threads)──────────────────────────────▶ not found, 0
//!    │
//!    ▼
//! for each thread, concurrently: extract ─▶ summarize   (failures skip the thread)
//!    │
//!    ▼
//! relevance filter ──(nothing relevant)─────────────────▶ unanswerable, 15
//!    │
//!    ▼
//! synthesize ─▶ score ─────────────────────────────────▶ answer
//! ```
//!
//! A credential rejection at any stage aborts the request.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{info, warn};

use crate::agents::decision::UNANSWERABLE_CONFIDENCE;
use crate::agents::{
    ConfidencePolicy, ExtractorAgent, RelevanceFilter, RetrieverAgent, SummarizerAgent,
    SynthesizerAgent, DISCOVERY_STAGE, EXTRACT_STAGE, SUMMARIZE_STAGE,
};
use crate::clients::{ForumClient, LanguageModel, SearchProvider};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, UpstreamError};
use crate::metrics::PipelineMetrics;
use crate::models::{FinalAnswer, ThreadSummary};

pub struct Pipeline {
    retriever: RetrieverAgent,
    extractor: ExtractorAgent,
    summarizer: SummarizerAgent,
    synthesizer: SynthesizerAgent,
    relevance: RelevanceFilter,
    confidence: ConfidencePolicy,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        search: Arc<dyn SearchProvider>,
        forum: Arc<dyn ForumClient>,
        llm: Arc<dyn LanguageModel>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            retriever: RetrieverAgent::new(search, config.search_result_limit, config.max_threads),
            extractor: ExtractorAgent::new(forum, config.comments_per_thread),
            summarizer: SummarizerAgent::new(llm.clone(), config.model.clone(), config.summary),
            synthesizer: SynthesizerAgent::new(llm, config.model.clone(), config.synthesis),
            relevance: RelevanceFilter::new(&config.irrelevance_markers),
            confidence: config.confidence,
            metrics,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<FinalAnswer, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            self.metrics.record_outcome("invalid_input");
            return Err(PipelineError::InvalidInput(
                "question must not be blank".to_string(),
            ));
        }

        let _timer = self.metrics.start_timer();
        let result = self.run(question).await;

        match &result {
            Ok(_) => {}
            Err(PipelineError::UpstreamAuth(e)) => {
                warn!(error = %e, "Pipeline aborted: upstream rejected credentials");
                self.metrics.record_outcome("auth_error");
            }
            Err(e) => {
                warn!(error = %e, "Pipeline failed");
                self.metrics.record_outcome("error");
            }
        }
        result
    }

    async fn run(&self, question: &str) -> Result<FinalAnswer, PipelineError> {
        let candidates = self.retriever.retrieve(question).await.map_err(|e| {
            warn!(stage = DISCOVERY_STAGE, error = %e, "Discovery failed");
            PipelineError::from(e)
        })?;

        if candidates.is_empty() {
            info!("No candidate threads found");
            self.metrics.record_outcome("empty");
            return Ok(FinalAnswer::not_found());
        }

        let summaries = self.summarize_candidates(question, &candidates).await?;
        let produced = summaries.len();
        let relevant = self.relevance.filter(summaries);
        info!(
            candidates = candidates.len(),
            summaries = produced,
            relevant = relevant.len(),
            "Summaries filtered"
        );

        if relevant.is_empty() {
            self.metrics.record_outcome("unanswerable");
            return Ok(FinalAnswer::unanswerable(UNANSWERABLE_CONFIDENCE));
        }

        let final_summary = self.synthesizer.synthesize(question, &relevant).await?;
        let confidence_score = self.confidence.score(relevant.len());

        self.metrics.record_outcome("success");
        Ok(FinalAnswer {
            final_summary,
            sources: relevant.into_iter().map(|s| s.source_link).collect(),
            confidence_score,
        })
    }

    /// Processes every candidate concurrently. Results come back in candidate
    /// order; the first credential rejection cancels the rest.
    async fn summarize_candidates(
        &self,
        question: &str,
        candidates: &[String],
    ) -> Result<Vec<ThreadSummary>, PipelineError> {
        let outcomes = try_join_all(
            candidates
                .iter()
                .map(|thread_id| self.process_candidate(question, thread_id)),
        )
        .await?;

        Ok(outcomes.into_iter().flatten().collect())
    }

    async fn process_candidate(
        &self,
        question: &str,
        thread_id: &str,
    ) -> Result<Option<ThreadSummary>, PipelineError> {
        let excerpt = match self.extractor.extract(thread_id).await {
            Ok(Some(excerpt)) => excerpt,
            Ok(None) => {
                self.metrics.record_skip(EXTRACT_STAGE);
                return Ok(None);
            }
            Err(e) => return self.skip_or_abort(EXTRACT_STAGE, thread_id, e),
        };

        match self.summarizer.summarize(question, thread_id, &excerpt).await {
            Ok(Some(summary)) => Ok(Some(summary)),
            Ok(None) => {
                self.metrics.record_skip(SUMMARIZE_STAGE);
                Ok(None)
            }
            Err(e) => self.skip_or_abort(SUMMARIZE_STAGE, thread_id, e),
        }
    }

    fn skip_or_abort(
        &self,
        stage: &'static str,
        thread_id: &str,
        err: UpstreamError,
    ) -> Result<Option<ThreadSummary>, PipelineError> {
        if err.is_auth() {
            return Err(PipelineError::UpstreamAuth(err));
        }
        warn!(stage, thread_id, error = %err, "Skipping thread");
        self.metrics.record_skip(stage);
        Ok(None)
    }
}
