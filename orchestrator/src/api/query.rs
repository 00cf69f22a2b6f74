use std::sync::Arc;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;
use warp::{Rejection, Reply};

use crate::error::ApiError;
use crate::models::QueryRequest;
use crate::pipeline::Pipeline;

pub async fn handle_query(
    request: QueryRequest,
    pipeline: Arc<Pipeline>,
) -> Result<impl Reply, Rejection> {
    let request_id = Uuid::new_v4();
    let span = info_span!("query", %request_id);

    async move {
        let question = request
            .question()
            .map_err(|e| warp::reject::custom(ApiError::from(e)))?;
        info!(question, "Processing query");

        let answer = pipeline
            .answer(question)
            .await
            .map_err(|e| warp::reject::custom(ApiError::from(e)))?;

        info!(
            sources = answer.sources.len(),
            confidence = answer.confidence_score,
            "Query answered"
        );
        Ok::<_, Rejection>(warp::reply::json(&answer))
    }
    .instrument(span)
    .await
}
