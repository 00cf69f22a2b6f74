// Decision rules: which summaries count as answers, and how confident the final answer is

use tracing::debug;

use crate::models::ThreadSummary;

/// Phrases the summarizer is instructed to use when a thread does not answer the question.
pub const DEFAULT_IRRELEVANCE_MARKERS: &[&str] = &[
    "does not provide any information",
    "is not about",
    "no relevant information",
    "unrelated to the question",
    "has nothing to do with",
    "not relevant to the question",
    "irrelevant to the question",
];

/// Confidence reported when threads were found but none of them answered the question.
pub const UNANSWERABLE_CONFIDENCE: u32 = 15;

/// Lexical classifier over summary text.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    markers: Vec<String>,
}

impl RelevanceFilter {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_relevant(&self, summary: &str) -> bool {
        let lowered = summary.to_lowercase();
        !self.markers.iter().any(|marker| lowered.contains(marker.as_str()))
    }

    /// Keeps relevant summaries in their original order.
    pub fn filter(&self, summaries: Vec<ThreadSummary>) -> Vec<ThreadSummary> {
        summaries
            .into_iter()
            .filter(|s| {
                let keep = self.is_relevant(&s.summary);
                if !keep {
                    debug!(source = %s.source_link, "Dropping summary flagged as irrelevant");
                }
                keep
            })
            .collect()
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_IRRELEVANCE_MARKERS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidencePolicy {
    pub base: u32,
    pub increment: u32,
    pub ceiling: u32,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            base: 50,
            increment: 10,
            ceiling: 95,
        }
    }
}

impl ConfidencePolicy {
    /// `min(base + increment * sources, ceiling)`, never above 100.
    pub fn score(&self, sources: usize) -> u32 {
        let sources = u32::try_from(sources).unwrap_or(u32::MAX);
        self.base
            .saturating_add(self.increment.saturating_mul(sources))
            .min(self.ceiling)
            .min(100)
    }
}
