use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::ForumClient;
use crate::error::UpstreamError;
use crate::models::{Comment, ThreadContent};

const SERVICE: &str = "reddit";

/// Tokens are refreshed this long before Reddit says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on top-level comments requested per thread.
const COMMENT_FETCH_LIMIT: &str = "50";

#[cfg_attr(test, derive(Debug))]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

impl TokenResponse {
    /// Reddit reports bad client credentials as a 200 carrying `error` instead of a token.
    fn into_access_token(self, issued_at: Instant) -> Result<AccessToken, UpstreamError> {
        let Some(value) = self.access_token else {
            return Err(UpstreamError::Auth {
                service: SERVICE,
                message: self
                    .error
                    .unwrap_or_else(|| "token response carried no access_token".to_string()),
            });
        };

        let lifetime = Duration::from_secs(self.expires_in.unwrap_or(3600));
        Ok(AccessToken {
            value,
            expires_at: issued_at + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }
}

/// Any refusal at the token endpoint means the app credentials are unusable.
fn classify_token_error(status: StatusCode, body: String) -> UpstreamError {
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        UpstreamError::rejected_credentials(SERVICE, status, &body)
    } else {
        UpstreamError::from_status(SERVICE, status, body)
    }
}

/// Application-only OAuth client for reading public threads.
pub struct RedditClient {
    client: Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    auth_url: String,
    api_url: String,
    token: RwLock<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(
        client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent: user_agent.into(),
            auth_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_url: "https://oauth.reddit.com".to_string(),
            token: RwLock::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, UpstreamError> {
        if let Some(token) = self.token.read().await.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let mut slot = self.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        info!("Requesting Reddit application token");
        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(USER_AGENT, &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| UpstreamError::transport(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Reddit token request rejected");
            return Err(classify_token_error(status, body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::malformed(SERVICE, e.to_string()))?;

        let token = token.into_access_token(Instant::now())?;
        let value = token.value.clone();
        *slot = Some(token);

        Ok(value)
    }
}

#[async_trait]
impl ForumClient for RedditClient {
    async fn fetch_thread(&self, thread_id: &str) -> Result<ThreadContent, UpstreamError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}/comments/{}", self.api_url, thread_id))
            .bearer_auth(token)
            .header(USER_AGENT, &self.user_agent)
            .query(&[
                ("sort", "top"),
                ("depth", "1"),
                ("raw_json", "1"),
                ("limit", COMMENT_FETCH_LIMIT),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::transport(SERVICE, e))?;

        // 403 here is a private or quarantined subreddit, not a credential problem.
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(SERVICE, status, body));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::malformed(SERVICE, e.to_string()))?;

        let thread = parse_thread(&payload)?;
        debug!(
            thread_id,
            comments = thread.comments.as_ref().map(Vec::len),
            "Fetched Reddit thread"
        );
        Ok(thread)
    }
}

/// Reads the `[post listing, comment listing]` pair returned by `/comments/<id>`.
fn parse_thread(payload: &Value) -> Result<ThreadContent, UpstreamError> {
    let post = &payload[0]["data"]["children"][0]["data"];
    let title = post["title"]
        .as_str()
        .ok_or_else(|| UpstreamError::malformed(SERVICE, "thread listing has no title"))?;

    let body = post["selftext"]
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from);

    let permalink = post["permalink"]
        .as_str()
        .map(|path| format!("https://www.reddit.com{}", path))
        .unwrap_or_default();

    // "more" placeholders carry no body and are not comments.
    let comments = payload[1]["data"]["children"].as_array().map(|children| {
        children
            .iter()
            .filter(|child| child["kind"] == "t1")
            .map(|child| Comment {
                body: child["data"]["body"].as_str().unwrap_or_default().to_string(),
                score: child["data"]["score"].as_i64(),
            })
            .collect()
    });

    Ok(ThreadContent {
        title: title.to_string(),
        body,
        permalink,
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(post: Value, comments: Value) -> Value {
        json!([
            { "kind": "Listing", "data": { "children": [ { "kind": "t3", "data": post } ] } },
            { "kind": "Listing", "data": { "children": comments } }
        ])
    }

    #[test]
    fn parses_post_and_top_level_comments() {
        let payload = listing(
            json!({
                "title": "Best mechanical keyboard under $100?",
                "selftext": "  Looking for something quiet.  ",
                "permalink": "/r/keyboards/comments/abc123/best_mechanical_keyboard/"
            }),
            json!([
                { "kind": "t1", "data": { "body": "Keychron K2", "score": 42 } },
                { "kind": "t1", "data": { "body": "Royal Kludge", "score": null } },
                { "kind": "more", "data": { "count": 12 } }
            ]),
        );

        let thread = parse_thread(&payload).unwrap();
        assert_eq!(thread.title, "Best mechanical keyboard under $100?");
        assert_eq!(thread.body.as_deref(), Some("Looking for something quiet."));
        assert_eq!(
            thread.permalink,
            "https://www.reddit.com/r/keyboards/comments/abc123/best_mechanical_keyboard/"
        );
        assert_eq!(
            thread.comments.unwrap(),
            vec![
                Comment { body: "Keychron K2".into(), score: Some(42) },
                Comment { body: "Royal Kludge".into(), score: None },
            ]
        );
    }

    #[test]
    fn link_posts_have_no_body() {
        let payload = listing(json!({ "title": "A link", "selftext": "" }), json!([]));
        let thread = parse_thread(&payload).unwrap();
        assert!(thread.body.is_none());
        assert_eq!(thread.comments, Some(vec![]));
    }

    #[test]
    fn missing_comment_listing_is_none() {
        let payload = json!([
            { "data": { "children": [ { "data": { "title": "Lonely post" } } ] } }
        ]);
        let thread = parse_thread(&payload).unwrap();
        assert!(thread.comments.is_none());
    }

    #[test]
    fn payload_without_post_is_malformed() {
        let err = parse_thread(&json!({ "error": 404 })).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed { .. }));
    }

    fn token_response(value: Value) -> TokenResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn token_refreshes_ahead_of_expiry() {
        let issued_at = Instant::now();
        let token = token_response(json!({ "access_token": "abc", "expires_in": 86400 }))
            .into_access_token(issued_at)
            .unwrap();

        assert_eq!(token.value, "abc");
        assert!(token.is_fresh());
        assert_eq!(
            token.expires_at,
            issued_at + Duration::from_secs(86400) - TOKEN_EXPIRY_MARGIN
        );
    }

    #[test]
    fn token_shorter_than_margin_is_never_fresh() {
        let token = token_response(json!({ "access_token": "abc", "expires_in": 30 }))
            .into_access_token(Instant::now())
            .unwrap();
        assert!(!token.is_fresh());
    }

    #[test]
    fn expired_token_is_not_fresh() {
        let token = AccessToken {
            value: "old".to_string(),
            expires_at: Instant::now() - Duration::from_secs(1),
        };
        assert!(!token.is_fresh());
    }

    #[test]
    fn token_response_without_token_is_auth_error() {
        let err = token_response(json!({ "error": "invalid_grant" }))
            .into_access_token(Instant::now())
            .unwrap_err();

        assert!(err.is_auth());
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn token_endpoint_refusals_are_auth_errors() {
        assert!(classify_token_error(StatusCode::UNAUTHORIZED, String::new()).is_auth());
        assert!(classify_token_error(StatusCode::FORBIDDEN, String::new()).is_auth());
        assert!(classify_token_error(StatusCode::BAD_REQUEST, "unsupported_grant_type".into()).is_auth());
        assert!(!classify_token_error(StatusCode::TOO_MANY_REQUESTS, String::new()).is_auth());
        assert!(!classify_token_error(StatusCode::SERVICE_UNAVAILABLE, String::new()).is_auth());
    }

    #[test]
    fn thread_fetch_forbidden_is_not_auth() {
        let private = UpstreamError::from_status(SERVICE, StatusCode::FORBIDDEN, "private".into());
        assert!(!private.is_auth());
    }
}
