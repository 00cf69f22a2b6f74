pub mod decision;
pub mod extractor;
pub mod retriever;
pub mod summarizer;
pub mod synthesizer;

pub use decision::{ConfidencePolicy, RelevanceFilter};
pub use extractor::ExtractorAgent;
pub use retriever::RetrieverAgent;
pub use summarizer::SummarizerAgent;
pub use synthesizer::SynthesizerAgent;

// Stage labels used in logs and metrics
pub const DISCOVERY_STAGE: &str = "discover";
pub const EXTRACT_STAGE: &str = "extract";
pub const SUMMARIZE_STAGE: &str = "summarize";
pub const SYNTHESIZE_STAGE: &str = "synthesize";
