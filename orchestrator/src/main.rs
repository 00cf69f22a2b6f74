use std::sync::Arc;

use tracing::{error, info};
use warp::{Filter, Reply};

mod agents;
mod api;
mod clients;
mod config;
mod error;
mod metrics;
mod middleware;
mod models;
mod pipeline;

#[cfg(test)]
mod testing;

use clients::{GoogleSearchClient, OpenAiClient, RedditClient};
use metrics::PipelineMetrics;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                )
            }),
        )
        .json()
        .init();

    info!("Starting threadsage question answering service");

    // Load configuration
    let config = config::Config::from_env().map_err(|e| {
        error!(error = %e, "Refusing to start");
        e
    })?;
    info!(
        model = %config.pipeline.model,
        max_threads = config.pipeline.max_threads,
        "Configuration loaded"
    );

    // One HTTP client shared by every upstream, each call bounded by the timeout
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    let credentials = &config.credentials;
    let search = Arc::new(GoogleSearchClient::new(
        http.clone(),
        &credentials.google_api_key,
        &credentials.google_cse_id,
    ));
    let forum = Arc::new(RedditClient::new(
        http.clone(),
        &credentials.reddit_client_id,
        &credentials.reddit_client_secret,
        &credentials.reddit_user_agent,
    ));
    let llm = Arc::new(
        OpenAiClient::new(http, &credentials.openai_api_key)
            .with_base_url(&credentials.openai_base_url),
    );

    let metrics = Arc::new(PipelineMetrics::new()?);
    let pipeline = Arc::new(Pipeline::new(
        &config.pipeline,
        search,
        forum,
        llm,
        metrics.clone(),
    ));
    let limiter = Arc::new(middleware::query_rate_limiter(config.rate_limit_per_minute));

    // Build API routes
    let api_routes = api::routes(pipeline, limiter).with(warp::log("api"));

    // Health check route
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "healthy"})));

    // Metrics route
    let metrics_route = warp::path("metrics")
        .and(warp::get())
        .map(move || match metrics.render() {
            Ok((content_type, buffer)) => {
                warp::reply::with_header(buffer, "Content-Type", content_type).into_response()
            }
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                warp::reply::with_status(
                    "metrics unavailable",
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                )
                .into_response()
            }
        });

    let routes = health
        .or(metrics_route)
        .or(api_routes)
        .recover(error::handle_rejection)
        .with(middleware::cors());

    // Start server
    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(
        ([0, 0, 0, 0], config.port),
        async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
        },
    );
    info!(%addr, "Server listening");

    server.await;

    Ok(())
}
