// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The gateway is a thin
//! translation layer: handlers validate input, delegate to the lifecycle /
//! store / rules / dispatcher components, and encode results.

use std::sync::Arc;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use vigil_core::{IncidentStore, VigilError};
use vigil_dispatch::Dispatcher;
use vigil_rules::AlertRule;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Health state for the unauthenticated liveness endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn IncidentStore>,
    pub dispatcher: Arc<Dispatcher>,
    /// Compiled alert rules; malformed ones were dropped at startup.
    pub rules: Arc<Vec<AlertRule>>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors ServerConfig from vigil-config).
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
}

/// Build the gateway router over the given state.
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    // Unauthenticated public routes (liveness for process supervisors).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    // Routes requiring authentication.
    let api_routes = Router::new()
        .route(
            "/v1/incidents",
            get(handlers::list_incidents).post(handlers::create_incident),
        )
        .route(
            "/v1/incidents/{id}",
            get(handlers::get_incident).put(handlers::update_incident),
        )
        .route("/v1/incidents/{id}/status", put(handlers::transition_incident))
        .route(
            "/v1/incidents/{id}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route(
            "/v1/incidents/{id}/attachments",
            get(handlers::list_attachments).post(handlers::add_attachment),
        )
        .route("/v1/incidents/{id}/audit", get(handlers::get_audit))
        .route("/v1/notify", post(handlers::notify))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server and serve until `shutdown` is cancelled.
pub async fn start_server(
    options: &ServerOptions,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), VigilError> {
    let app = build_router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VigilError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| VigilError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
