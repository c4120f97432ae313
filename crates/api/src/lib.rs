//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for account holders and administrators
//! - A server-sent event stream of committed ledger changes
//! - Authentication middleware

pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::Router;
use poolbank_core::ledger::{LedgerStore, Provisioner};
use poolbank_shared::JwtService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger storage.
    pub store: Arc<dyn LedgerStore>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Account provisioning.
    pub provisioner: Arc<Provisioner>,
    /// Number of audit entries, flags and notifications returned by reads.
    pub recent_limit: u64,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
