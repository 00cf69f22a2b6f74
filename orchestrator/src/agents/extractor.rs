// Extractor Agent: fetches a thread and keeps its highest-scored comments

use std::sync::Arc;

use tracing::{debug, info};

use crate::clients::ForumClient;
use crate::error::UpstreamError;
use crate::models::{Comment, ThreadExcerpt};

pub struct ExtractorAgent {
    forum: Arc<dyn ForumClient>,
    comments_per_thread: usize,
}

impl ExtractorAgent {
    pub fn new(forum: Arc<dyn ForumClient>, comments_per_thread: usize) -> Self {
        Self {
            forum,
            comments_per_thread,
        }
    }

    /// `Ok(None)` means the thread has nothing worth summarizing.
    pub async fn extract(&self, thread_id: &str) -> Result<Option<ThreadExcerpt>, UpstreamError> {
        let thread = self.forum.fetch_thread(thread_id).await?;

        let comments = match thread.comments {
            Some(comments) if !comments.is_empty() => comments,
            _ => {
                info!(thread_id, "Extractor: Thread has no comments, skipping");
                return Ok(None);
            }
        };

        let selected = select_top_comments(comments, self.comments_per_thread);
        if selected.is_empty() {
            info!(thread_id, "Extractor: No usable comments after selection, skipping");
            return Ok(None);
        }

        debug!(
            thread_id,
            permalink = %thread.permalink,
            selected = selected.len(),
            "Extractor: Comments selected"
        );
        Ok(Some(ThreadExcerpt {
            title: thread.title,
            body: thread.body,
            comments: selected,
        }))
    }
}

/// Highest score first, missing score counts as 0, ties keep forum order.
pub fn select_top_comments(mut comments: Vec<Comment>, top_k: usize) -> Vec<Comment> {
    comments.retain(is_readable);
    // sort_by is stable
    comments.sort_by(|a, b| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0)));
    comments.truncate(top_k);
    comments
}

fn is_readable(comment: &Comment) -> bool {
    let body = comment.body.trim();
    !body.is_empty() && body != "[deleted]" && body != "[removed]"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreadContent;
    use crate::testing::MockForum;

    fn comment(body: &str, score: Option<i64>) -> Comment {
        Comment {
            body: body.to_string(),
            score,
        }
    }

    fn bodies(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.body.as_str()).collect()
    }

    #[test]
    fn sorts_descending_and_truncates() {
        let selected = select_top_comments(
            vec![
                comment("low", Some(1)),
                comment("high", Some(50)),
                comment("mid", Some(10)),
                comment("lowest", Some(-3)),
            ],
            3,
        );
        assert_eq!(bodies(&selected), vec!["high", "mid", "low"]);
    }

    #[test]
    fn missing_score_counts_as_zero_and_ties_are_stable() {
        let selected = select_top_comments(
            vec![
                comment("first unscored", None),
                comment("negative", Some(-1)),
                comment("zero", Some(0)),
                comment("second unscored", None),
            ],
            4,
        );
        assert_eq!(
            bodies(&selected),
            vec!["first unscored", "zero", "second unscored", "negative"]
        );
    }

    #[test]
    fn drops_deleted_and_blank_comments() {
        let selected = select_top_comments(
            vec![
                comment("[deleted]", Some(100)),
                comment("  ", Some(90)),
                comment("[removed]", Some(80)),
                comment("kept", Some(1)),
            ],
            3,
        );
        assert_eq!(bodies(&selected), vec!["kept"]);
    }

    fn thread(comments: Option<Vec<Comment>>) -> ThreadContent {
        ThreadContent {
            title: "Which IDE for Rust?".to_string(),
            body: None,
            permalink: "https://www.reddit.com/r/rust/comments/abc123/".to_string(),
            comments,
        }
    }

    #[tokio::test]
    async fn skips_threads_without_comments() {
        let forum = Arc::new(
            MockForum::new()
                .with_thread("nolist", thread(None))
                .with_thread("empty1", thread(Some(vec![])))
                .with_thread("gone01", thread(Some(vec![comment("[deleted]", Some(3))]))),
        );
        let agent = ExtractorAgent::new(forum, 3);

        for id in ["nolist", "empty1", "gone01"] {
            assert!(agent.extract(id).await.unwrap().is_none(), "{} should be skipped", id);
        }
    }

    #[tokio::test]
    async fn zero_top_k_skips_thread() {
        let forum = Arc::new(
            MockForum::new().with_thread("abc123", thread(Some(vec![comment("RustRover", Some(5))]))),
        );
        let agent = ExtractorAgent::new(forum, 0);
        assert!(agent.extract("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn builds_excerpt_from_selected_comments() {
        let forum = Arc::new(MockForum::new().with_thread(
            "abc123",
            thread(Some(vec![
                comment("VS Code with rust-analyzer", Some(12)),
                comment("RustRover", Some(30)),
            ])),
        ));
        let agent = ExtractorAgent::new(forum, 1);

        let excerpt = agent.extract("abc123").await.unwrap().unwrap();
        assert_eq!(excerpt.title, "Which IDE for Rust?");
        assert_eq!(bodies(&excerpt.comments), vec!["RustRover"]);
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let forum = Arc::new(MockForum::new());
        let agent = ExtractorAgent::new(forum, 3);
        assert!(agent.extract("unknown").await.is_err());
    }
}
