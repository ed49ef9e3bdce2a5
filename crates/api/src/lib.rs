//! HTTP API layer for Cozum Var.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: auth, categories, reports, comments, users, teams, health
//! - **Extractors**: authenticated user, request origin
//! - **Middleware**: bearer token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::Router;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};

/// Build the `/api` application with authentication applied.
///
/// Transport layers (tracing, CORS, body limits, static files) are added by
/// the server binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
