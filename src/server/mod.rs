//! HTTP surface: `POST /parse`, `POST /v1/parse` and `GET /health`.

pub mod handlers;
pub mod response;

use crate::config::{Config, ServerConfig};
use crate::defaults;
use crate::error::Result;
use crate::pipeline::ParsePipeline;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::LatencyUnit;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// State shared by every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<ParsePipeline>,
}

impl AppState {
    pub fn new(pipeline: ParsePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the router with CORS, body limit and request logging.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let body_limit = usize::try_from(config.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(defaults::MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/parse", post(handlers::parse))
        .route("/v1/parse", post(handlers::parse))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&config.allow_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

/// `*` allows any origin; otherwise a comma-separated list.
pub fn cors_layer(allow_origins: &str) -> CorsLayer {
    let origin = if allow_origins.trim() == "*" || allow_origins.trim().is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allow_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = o, "ignoring unusable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Build the pipeline from config and serve until Ctrl+C.
pub async fn serve(config: &Config) -> Result<()> {
    let pipeline = ParsePipeline::from_config(config)?;
    let app = router(AppState::new(pipeline), &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        timeout_secs = config.server.request_timeout_secs,
        max_upload_mb = config.server.max_upload_mb,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
