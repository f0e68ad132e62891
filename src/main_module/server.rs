//! HTTP server initialization and routing

use axum::http::{header, Method};
use axum::{middleware, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api_router::configure_api_routes;
use crate::core::middleware::{authentication_middleware, request_id_middleware};
use crate::core::shared::state::AppState;

use super::shutdown_signal;

pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// The full application: API routes plus authentication, request id,
/// CORS and tracing layers.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    configure_api_routes(&app_state.config)
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            authentication_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_axum_server(app_state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
