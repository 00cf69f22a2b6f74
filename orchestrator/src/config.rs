use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use crate::agents::decision::{ConfidencePolicy, DEFAULT_IRRELEVANCE_MARKERS};
use crate::error::PipelineError;

/// Output bound and randomness for one model stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub google_api_key: String,
    pub google_cse_id: String,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub search_result_limit: usize,
    pub max_threads: usize,
    pub comments_per_thread: usize,
    pub model: String,
    pub summary: StageSettings,
    pub synthesis: StageSettings,
    pub irrelevance_markers: Vec<String>,
    pub confidence: ConfidencePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_result_limit: 10,
            max_threads: 5,
            comments_per_thread: 3,
            model: "gpt-4o-mini".to_string(),
            summary: StageSettings {
                max_tokens: 150,
                temperature: 0.3,
            },
            synthesis: StageSettings {
                max_tokens: 600,
                temperature: 0.5,
            },
            irrelevance_markers: DEFAULT_IRRELEVANCE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            confidence: ConfidencePolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub http_timeout_secs: u64,
    pub rate_limit_per_minute: NonZeroU32,
    pub credentials: Credentials,
    pub pipeline: PipelineConfig,
}

const REQUIRED_KEYS: &[&str] = &[
    "GOOGLE_API_KEY",
    "GOOGLE_CSE_ID",
    "REDDIT_CLIENT_ID",
    "REDDIT_CLIENT_SECRET",
    "OPENAI_API_KEY",
];

impl Config {
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            search_result_limit: parse_or(&get, "SEARCH_RESULT_LIMIT", defaults.search_result_limit)?,
            max_threads: parse_or(&get, "MAX_THREADS", defaults.max_threads)?,
            comments_per_thread: parse_or(&get, "COMMENTS_PER_THREAD", defaults.comments_per_thread)?,
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            summary: StageSettings {
                max_tokens: parse_or(&get, "SUMMARY_MAX_TOKENS", defaults.summary.max_tokens)?,
                temperature: parse_or(&get, "SUMMARY_TEMPERATURE", defaults.summary.temperature)?,
            },
            synthesis: StageSettings {
                max_tokens: parse_or(&get, "SYNTHESIS_MAX_TOKENS", defaults.synthesis.max_tokens)?,
                temperature: parse_or(
                    &get,
                    "SYNTHESIS_TEMPERATURE",
                    defaults.synthesis.temperature,
                )?,
            },
            irrelevance_markers: get("IRRELEVANCE_MARKERS")
                .map(|raw| {
                    raw.split('|')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.irrelevance_markers),
            confidence: ConfidencePolicy {
                base: parse_or(&get, "CONFIDENCE_BASE", defaults.confidence.base)?,
                increment: parse_or(&get, "CONFIDENCE_INCREMENT", defaults.confidence.increment)?,
                ceiling: parse_or(&get, "CONFIDENCE_CEILING", defaults.confidence.ceiling)?,
            },
        };

        if pipeline.confidence.ceiling > 100 {
            return Err(PipelineError::Configuration(
                "CONFIDENCE_CEILING must not exceed 100".to_string(),
            ));
        }

        Ok(Config {
            port: parse_or(&get, "PORT", 8080)?,
            http_timeout_secs: parse_or(&get, "HTTP_TIMEOUT_SECS", 20)?,
            rate_limit_per_minute: parse_or(
                &get,
                "RATE_LIMIT_PER_MINUTE",
                NonZeroU32::new(30).unwrap_or(NonZeroU32::MIN),
            )?,
            credentials: Credentials {
                google_api_key: required("GOOGLE_API_KEY"),
                google_cse_id: required("GOOGLE_CSE_ID"),
                reddit_client_id: required("REDDIT_CLIENT_ID"),
                reddit_client_secret: required("REDDIT_CLIENT_SECRET"),
                reddit_user_agent: get("REDDIT_USER_AGENT")
                    .unwrap_or_else(|| "threadsage/0.1".to_string()),
                openai_api_key: required("OPENAI_API_KEY"),
                openai_base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            },
            pipeline,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, PipelineError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e| {
            PipelineError::Configuration(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
        None => Ok(default),
    }
}
