//! Socialgate - a minimal social login server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Login / logout / home pages                              │
//! │  - /auth/{provider} redirect and callback                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Auth + Service Layer                       │
//! │  - Provider adapters (GitHub, Google, Facebook)             │
//! │  - Signed cookie sessions                                   │
//! │  - Identity resolution (find-or-create)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: home page and metrics handlers
//! - `auth`: provider OAuth, sessions, middleware
//! - `service`: identity resolution
//! - `data`: database layer
//! - `views`: HTML pages
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod views;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Built once at startup and cloned into each request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Find-or-create over the user store
    pub identities: service::IdentityService,

    /// Configured identity providers
    pub providers: Arc<auth::Providers>,

    /// HTTP client for provider token and profile requests
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Register configured providers
    /// 3. Build the outbound HTTP client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        let db = Arc::new(db);

        let providers = auth::Providers::from_config(&config.providers);
        if providers.enabled().is_empty() {
            tracing::warn!("No identity providers configured; nobody will be able to sign in");
        } else {
            tracing::info!(providers = ?providers.enabled(), "Identity providers registered");
        }

        let http_client = reqwest::Client::builder()
            .user_agent("Socialgate/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            identities: service::IdentityService::new(db.clone()),
            db,
            providers: Arc::new(providers),
            http_client,
        })
    }

    /// Release resources held by the state
    pub async fn shutdown(&self) {
        self.db.close().await;
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{services::ServeDir, trace::TraceLayer};

    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::home_router(state.clone()))
        .merge(auth::auth_router())
        .merge(api::metrics_router())
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
