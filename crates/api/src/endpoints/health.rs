//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};
use cozum_common::StorageProbe;
use serde::Serialize;

use super::route;
use crate::middleware::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub storage: StorageProbe,
}

/// Report database reachability and whether storage accepts writes.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match cozum_db::ping(&state.db).await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            "unavailable"
        }
    };

    let storage = state.storage.probe().await;
    if !storage.writable {
        tracing::warn!(
            backend = storage.backend,
            location = %storage.location,
            error = ?storage.error,
            "Health check: storage not writable"
        );
    }

    let status = if database == "ok" && storage.writable {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        service: "cozum-var-backend",
        version: env!("CARGO_PKG_VERSION"),
        database,
        storage,
    })
}

pub fn router() -> Router<AppState> {
    route(Router::new(), "/health", get(health))
}
