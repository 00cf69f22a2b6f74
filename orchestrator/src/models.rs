use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

pub const NOT_FOUND_MESSAGE: &str =
    "Could not find relevant Reddit discussions via Google for this question.";
pub const UNANSWERABLE_MESSAGE: &str =
    "Found some Reddit discussions, but couldn't extract direct answers to your question from them.";

// Search and forum payloads

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub link: String,
}

impl SearchHit {
    pub fn new(link: impl Into<String>) -> Self {
        Self { link: link.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub body: String,
    pub score: Option<i64>,
}

/// A thread as returned by the forum. `comments` is `None` when the
/// forum response carried no usable comment listing.
#[derive(Debug, Clone)]
pub struct ThreadContent {
    pub title: String,
    pub body: Option<String>,
    pub permalink: String,
    pub comments: Option<Vec<Comment>>,
}

/// The part of a thread that is shown to the model.
#[derive(Debug, Clone)]
pub struct ThreadExcerpt {
    pub title: String,
    pub body: Option<String>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub summary: String,
    pub source_link: String,
}

// API Request/Response models

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<Value>,
}

impl QueryRequest {
    /// Returns the trimmed question, rejecting anything that is not non-empty text.
    pub fn question(&self) -> Result<&str, PipelineError> {
        match self.question.as_ref() {
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim()),
            Some(Value::String(_)) => Err(PipelineError::InvalidInput(
                "question must not be blank".to_string(),
            )),
            Some(_) => Err(PipelineError::InvalidInput(
                "question must be a string".to_string(),
            )),
            None => Err(PipelineError::InvalidInput(
                "question is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalAnswer {
    pub final_summary: String,
    pub sources: Vec<String>,
    pub confidence_score: u32,
}

impl FinalAnswer {
    pub fn not_found() -> Self {
        Self {
            final_summary: NOT_FOUND_MESSAGE.to_string(),
            sources: vec![],
            confidence_score: 0,
        }
    }

    pub fn unanswerable(confidence_score: u32) -> Self {
        Self {
            final_summary: UNANSWERABLE_MESSAGE.to_string(),
            sources: vec![],
            confidence_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_is_trimmed() {
        let request: QueryRequest =
            serde_json::from_value(json!({ "question": "  best budget headphones?  " })).unwrap();
        assert_eq!(request.question().unwrap(), "best budget headphones?");
    }

    #[test]
    fn rejects_missing_blank_and_non_text_questions() {
        for body in [json!({}), json!({ "question": "   " }), json!({ "question": 42 })] {
            let request: QueryRequest = serde_json::from_value(body).unwrap();
            assert!(matches!(
                request.question(),
                Err(PipelineError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn final_answer_serializes_camel_case() {
        let value = serde_json::to_value(FinalAnswer::not_found()).unwrap();
        assert_eq!(
            value,
            json!({
                "finalSummary": NOT_FOUND_MESSAGE,
                "sources": [],
                "confidenceScore": 0
            })
        );
    }
}
