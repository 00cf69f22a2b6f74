// Retriever Agent: discovers candidate Reddit threads through web search

use std::sync::Arc;

use indexmap::IndexSet;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::clients::SearchProvider;
use crate::error::UpstreamError;
use crate::models::SearchHit;

pub const SITE_HINT: &str = "site:reddit.com";
pub const FORUM_DOMAIN: &str = "reddit.com";

lazy_static! {
    // Matches /r/<sub>/comments/<id>/... and the short /comments/<id> form.
    static ref THREAD_ID_REGEX: Regex =
        Regex::new(r"/(?:r/[^/]+/)?comments/([A-Za-z0-9]{6,10})(?:[/?#]|$)").unwrap();
}

/// Canonical link for a thread; every summary's source is built here.
pub fn thread_link(thread_id: &str) -> String {
    format!("https://www.reddit.com/comments/{}", thread_id)
}

pub struct RetrieverAgent {
    search: Arc<dyn SearchProvider>,
    result_limit: usize,
    max_threads: usize,
}

impl RetrieverAgent {
    pub fn new(search: Arc<dyn SearchProvider>, result_limit: usize, max_threads: usize) -> Self {
        Self {
            search,
            result_limit,
            max_threads,
        }
    }

    /// Returns unique thread ids in search-ranking order, at most `max_threads`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>, UpstreamError> {
        let search_query = format!("{} {}", query, SITE_HINT);
        info!(query = %search_query, "Retriever: Searching");

        let hits = self.search.search(&search_query, self.result_limit).await?;
        let ids = extract_thread_ids(&hits, self.max_threads);

        info!(results = hits.len(), threads = ids.len(), "Retriever: Candidate threads found");
        Ok(ids)
    }
}

pub fn extract_thread_ids(hits: &[SearchHit], cap: usize) -> Vec<String> {
    let mut ids = IndexSet::new();

    for hit in hits {
        if ids.len() >= cap {
            break;
        }
        if !hit.link.contains(FORUM_DOMAIN) {
            continue;
        }
        if let Some(captures) = THREAD_ID_REGEX.captures(&hit.link) {
            ids.insert(captures[1].to_string());
        }
    }

    ids.into_iter().collect()
}
