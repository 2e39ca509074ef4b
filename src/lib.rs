//! ConnectHub - a social networking backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - REST endpoints under /api                                │
//! │  - Health and metrics                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Interest/hobby matching                                  │
//! │  - Connection lifecycle, messaging                          │
//! │  - Notification and activity side effects                   │
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
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `data`: Database layer and models
//! - `auth`: Signed session tokens and the `CurrentUser` extractor
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus registry

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and services.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Interest and hobby matching
    pub discovery: Arc<service::DiscoveryService>,

    /// Connection request lifecycle
    pub connections: Arc<service::ConnectionService>,

    /// Direct messages
    pub messaging: Arc<service::MessagingService>,

    /// Notification and activity writer
    pub feed: Arc<service::FeedService>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Seed the user gauge
    /// 3. Build services
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect_with_pool_size(
            &config.database.path,
            config.database.max_connections,
        )
        .await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 2. Seed the user gauge
        let users = db.count_users().await?;
        metrics::USERS_TOTAL.set(users);

        // 3. Build services
        let db = Arc::new(db);
        let feed = Arc::new(service::FeedService::new(db.clone()));
        let discovery = Arc::new(service::DiscoveryService::new(
            db.clone(),
            config.discovery.clone(),
        ));
        let connections = Arc::new(service::ConnectionService::new(
            db.clone(),
            feed.clone(),
            config.connections.clone(),
        ));
        let messaging = Arc::new(service::MessagingService::new(db.clone(), feed.clone()));

        tracing::info!(users, "Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            discovery,
            connections,
            messaging,
            feed,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower::ServiceBuilder;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::rest_api_router())
        .merge(api::metrics_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer)
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
