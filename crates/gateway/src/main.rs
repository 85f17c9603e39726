//! Citequill API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Request routing for authors, articles, references, and login
//! - CORS for the configured caller addresses
//! - Observability (logging, metrics, request IDs)

mod handlers;
mod patch;

use axum::{
    http::HeaderValue,
    routing::{delete, get, patch, post},
    Router,
};
use citequill_common::{
    config::{AppConfig, CorsConfig},
    db::DbPool,
    mail, metrics, scoring,
    mail::Mailer,
    scoring::CitationScorer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    /// Absent when no scoring API key is configured
    pub scorer: Option<Arc<dyn CitationScorer>>,
    /// Absent when no mail API key is configured
    pub mailer: Option<Arc<dyn Mailer>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting Citequill API Gateway v{}", citequill_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();

    // Initialize database connection and apply the schema
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    db.bootstrap_schema().await?;

    // Callout clients; either may be disabled by missing keys
    let scorer = scoring::create_scorer(&config.scoring);
    let mailer = mail::create_mailer(&config.mail);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        scorer,
        mailer,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.cors);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Author endpoints
        .route("/authors/", post(handlers::authors::create_author))
        .route("/authors/", get(handlers::authors::list_authors))
        .route("/authors/by-email", post(handlers::authors::get_author_by_email))
        .route("/authors/{id}", get(handlers::authors::get_author))
        .route("/authors/{id}", delete(handlers::authors::delete_author))
        .route("/authors/{id}", patch(handlers::authors::patch_author))
        // Login endpoint
        .route("/client/login", post(handlers::client::login))
        // Article endpoints
        .route("/articles/", post(handlers::articles::create_article))
        .route("/articles/search", get(handlers::articles::search_articles))
        .route("/articles/lucky", get(handlers::articles::lucky_article))
        .route(
            "/articles/authors/{author_id}/articles",
            get(handlers::articles::list_articles_by_author),
        )
        .route("/articles/{id}", get(handlers::articles::get_article))
        .route("/articles/{id}", delete(handlers::articles::delete_article))
        // Reference endpoints
        .route("/references/", post(handlers::references::create_reference))
        .route(
            "/references/from/{article_id}",
            get(handlers::references::list_references_from),
        )
        .route(
            "/references/to/{article_id}",
            get(handlers::references::list_references_to),
        )
        .route("/references/{id}", get(handlers::references::get_reference))
        .route("/references/{id}", patch(handlers::references::patch_reference))
        // Layers
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Build the CORS layer from configuration; an empty allowlist means any
/// origin may call
fn build_cors(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
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
