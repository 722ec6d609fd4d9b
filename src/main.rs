mod auth;
mod cache;
mod classify;
mod config;
mod errors;
mod filters;
mod handlers;
mod health;
mod models;
mod pardot_client;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::CacheService;
use crate::config::Config;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The response cache.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prospect_health_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Shared response cache; entries carry their own TTL and checksum
    let cache = CacheService::new();
    tracing::info!("Response cache initialized");

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        config: config.clone(),
        cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // Database health report endpoints
        .route("/api/v1/health/stats", get(handlers::get_health_stats))
        .route("/api/v1/health/report", get(handlers::get_health_report))
        .route(
            "/api/v1/health/sections/:section",
            get(handlers::get_health_section),
        )
        .route("/api/v1/health/charts", get(handlers::get_health_charts))
        .route(
            "/api/v1/health/recommendations",
            get(handlers::get_health_recommendations),
        )
        // Prospect analysis endpoints
        .route("/api/v1/prospects/health", get(handlers::get_prospect_health))
        .route("/api/v1/prospects/all", get(handlers::get_all_prospects))
        .route("/api/v1/prospects/active", get(handlers::get_active_prospects))
        .route(
            "/api/v1/prospects/duplicates",
            get(handlers::get_duplicate_prospects),
        )
        .route(
            "/api/v1/prospects/inactive",
            get(handlers::get_inactive_prospects),
        )
        .route(
            "/api/v1/prospects/missing-fields",
            get(handlers::get_missing_fields_prospects),
        )
        .route(
            "/api/v1/prospects/scoring-issues",
            get(handlers::get_scoring_issues_prospects),
        )
        .route("/api/v1/prospects/filter", post(handlers::filter_prospects))
        // Activity endpoints
        .route("/api/v1/activities/count", get(handlers::count_activities))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting for deploys)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
