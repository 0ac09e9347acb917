//! DocChat API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Chat and document CRUD
//! - File/URL document ingestion
//! - Question answering over a chat's documents
//! - Observability (logging, metrics, tracing)
//! - Static frontend serving

mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use docchat_common::{
    config::AppConfig,
    db::DbPool,
    inference::QaBackend,
    metrics::register_metrics,
    qa::{AnsweringEngine, ModelRegistry},
    HfInferenceClient,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub engine: Arc<AnsweringEngine>,
    pub inference: Arc<HfInferenceClient>,
    /// Client for URL document downloads
    pub http: reqwest::Client,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting DocChat API Gateway v{}", docchat_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    let metrics = init_metrics()?;

    // The inference client fails fast at startup when the token is missing,
    // so a misconfigured deployment never serves degraded answers
    let inference = Arc::new(HfInferenceClient::new(&config.inference)?);
    let backend: Arc<dyn QaBackend> = inference.clone();
    let engine = Arc::new(AnsweringEngine::new(backend, ModelRegistry::new()));

    // Initialize database connection (creates the schema when missing)
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    let http = reqwest::Client::builder()
        .timeout(config.download_timeout())
        .build()?;

    let state = AppState {
        config: config.clone(),
        db,
        engine,
        inference,
        http,
        metrics,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the Prometheus recorder, then register the metric descriptions.
/// Descriptions issued before a recorder is installed are silently dropped,
/// so the order here matters.
fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        // Model catalog
        .route("/api/models", get(handlers::models::list_models))
        // Chat endpoints
        .route(
            "/api/chats",
            get(handlers::chats::list_chats).post(handlers::chats::create_chat),
        )
        .route(
            "/api/chats/{chat_id}",
            get(handlers::chats::get_chat).patch(handlers::chats::update_chat),
        )
        // Document endpoints
        .route("/api/chats/{chat_id}/upload", post(handlers::documents::upload))
        .route("/api/chats/{chat_id}/add-urls", post(handlers::documents::add_urls))
        .route(
            "/api/chats/{chat_id}/documents/{document_id}",
            patch(handlers::documents::update_document_enabled),
        )
        // Ask endpoint
        .route("/api/chats/{chat_id}/ask", post(handlers::ask::ask));

    // Mount static last so API routes take precedence
    let static_dir = PathBuf::from(&state.config.server.static_dir);
    let router = if static_dir.is_dir() {
        api_routes.fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
    } else {
        api_routes
    };

    router
        .layer(DefaultBodyLimit::max(
            state.config.upload.max_file_bytes + 1024 * 1024,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_descriptions_survive_into_render() {
        // One recorder per process; this is the only test that installs it
        let handle = init_metrics().expect("recorder installed");
        metrics::counter!("docchat_asks_total").increment(1);
        let rendered = handle.render();
        assert!(rendered.contains("# HELP docchat_asks_total"));
    }
}
