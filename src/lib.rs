//! Action Archive - daily archival of registry actions to public storage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - PUT /actions:upload                                      │
//! │  - GET /_ah/health, GET /metrics                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Report date resolution                                   │
//! │  - Fetch → serialize → publish                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Collaborators                            │
//! │  - Action registry (HTTP)                                   │
//! │  - Object store (S3-compatible, public-read objects)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Archive run and date resolution
//! - `registry`: Action registry client
//! - `storage`: Object store clients
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request. Everything in it is immutable after startup,
/// so requests share it without locking.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Source of the invocation time
    pub clock: Arc<dyn service::Clock>,

    /// Archive pipeline (registry + object store)
    pub archive: service::ArchiveService,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the registry HTTP client
    /// 2. Build the object store client from configured credentials
    ///
    /// # Errors
    /// Returns error if any client cannot be constructed
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Registry client
        let registry = registry::HttpRegistry::new(&config.registry)?;
        tracing::info!(base_url = %config.registry.base_url, "Registry client initialized");

        // 2. Object store
        let store = storage::S3ObjectStore::new(&config.storage)?;
        tracing::info!(
            bucket = %config.storage.bucket,
            endpoint = %config.storage.endpoint,
            "Object store initialized"
        );

        Ok(Self::with_components(
            config,
            Arc::new(registry),
            Arc::new(store),
            Arc::new(service::SystemClock),
        ))
    }

    /// Assemble state from already constructed collaborators
    pub fn with_components(
        config: config::AppConfig,
        registry: Arc<dyn registry::ActionRegistry>,
        store: Arc<dyn storage::ObjectStore>,
        clock: Arc<dyn service::Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            clock,
            archive: service::ArchiveService::new(registry, store),
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/_ah/health", axum::routing::get(health_check))
        .merge(api::archive_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "ok"
}
