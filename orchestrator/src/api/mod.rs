use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use crate::middleware::{rate_limit, QueryRateLimiter};
use crate::pipeline::Pipeline;

mod query;

/// Largest accepted request body.
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    pipeline: Arc<Pipeline>,
    limiter: Arc<QueryRateLimiter>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    api.and(warp::path("query"))
        .and(warp::path::end())
        .and(warp::post())
        .and(rate_limit(limiter))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_pipeline(pipeline))
        .and_then(query::handle_query)
}

fn with_pipeline(
    pipeline: Arc<Pipeline>,
) -> impl Filter<Extract = (Arc<Pipeline>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || pipeline.clone())
}
