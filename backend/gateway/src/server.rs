//! Main HTTP Gateway Server.

use std::sync::Arc;
use std::time::Instant;

use agrolens_core::ImageAnalyzer;
use agrolens_understanding::VisionGateway;
use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::config::GatewayConfig;
use crate::crop_detect;
use crate::health_api;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub analyzer: Arc<dyn ImageAnalyzer>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        Self {
            analyzer,
            started_at: Instant::now(),
        }
    }
}

/// Browser clients call the detect endpoint cross-origin with their own auth headers.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

/// Build the gateway router.
///
///   POST /crop-detect: multipart upload, field `file`
///   GET  /health: liveness
pub fn build_router(state: GatewayState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/crop-detect", post(crop_detect::crop_detect))
        .route("/health", get(health_api::get_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the gateway HTTP server and runs until Ctrl-C.
#[instrument(skip(config), fields(addr = %config.addr()))]
pub async fn start_server(config: GatewayConfig) -> Result<()> {
    if config.ai_gateway_api_key.is_none() {
        warn!("AI_GATEWAY_API_KEY is not set; every analysis will fail until it is configured");
    }

    let analyzer = VisionGateway::new(config.ai_gateway_api_key.clone())
        .with_endpoint(config.ai_gateway_url.clone())
        .with_model(config.ai_model.clone());
    info!(model = analyzer.model(), upstream = %config.ai_gateway_url, "Configured AI gateway");

    let app = build_router(GatewayState::new(Arc::new(analyzer)), config.max_upload_bytes);

    let listener = TcpListener::bind(config.addr()).await?;
    info!("Gateway HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
