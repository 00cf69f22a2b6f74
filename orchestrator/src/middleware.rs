use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tracing::warn;
use warp::{Filter, Rejection};

use crate::error::ApiError;

pub type QueryRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Process-wide quota on the query endpoint.
pub fn query_rate_limiter(per_minute: NonZeroU32) -> QueryRateLimiter {
    RateLimiter::direct(Quota::per_minute(per_minute))
}

/// Spends one unit of quota per matched request, before the body is read.
pub fn rate_limit(
    limiter: Arc<QueryRateLimiter>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::any()
        .and_then(move || {
            let limiter = limiter.clone();
            async move {
                if limiter.check().is_err() {
                    warn!("Request rejected by rate limiter");
                    return Err(warp::reject::custom(ApiError::RateLimitExceeded));
                }
                Ok(())
            }
        })
        .untuple_one()
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec![
            "User-Agent",
            "Origin",
            "Access-Control-Request-Method",
            "Access-Control-Request-Headers",
            "Content-Type",
            "Accept",
            "Content-Length",
        ])
        .allow_methods(vec!["POST", "GET", "OPTIONS"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_rejects_after_quota() {
        let limiter = query_rate_limiter(NonZeroU32::new(2).unwrap());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
