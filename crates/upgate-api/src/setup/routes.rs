//! Route configuration and setup

use crate::auth::identity_gate_middleware;
use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use upgate_core::Config;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Every issuance and listing route sits behind the identity gate
    let protected_routes = protected_routes().route_layer(axum::middleware::from_fn_with_state(
        state.gate.clone(),
        identity_gate_middleware,
    ));

    let app = public_routes()
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
}

/// Protected routes (require a verified, allow-listed principal)
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/generate-direct-url", API_PREFIX),
            post(handlers::uploads::generate_direct_url),
        )
        .route(
            &format!("{}/generate-signed-url", API_PREFIX),
            post(handlers::uploads::generate_direct_url),
        )
        .route(
            &format!("{}/generate-post-url", API_PREFIX),
            post(handlers::uploads::generate_post_url),
        )
        .route(
            &format!("{}/generate-resumable-url", API_PREFIX),
            post(handlers::uploads::generate_resumable_url),
        )
        .route(
            &format!("{}/list-files", API_PREFIX),
            get(handlers::files::list_files),
        )
}
