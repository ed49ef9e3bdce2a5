//! API endpoints.

mod auth;
mod categories;
mod comments;
mod health;
mod reports;
mod teams;
mod users;

use axum::{Router, routing::MethodRouter};

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(categories::router())
        .merge(reports::router())
        .merge(comments::router())
        .merge(users::router())
        .merge(teams::router())
        .merge(health::router())
}

/// Register `path` both with and without a trailing slash.
pub(crate) fn route(
    router: Router<AppState>,
    path: &str,
    handler: MethodRouter<AppState>,
) -> Router<AppState> {
    let bare = path.trim_end_matches('/');
    router
        .route(bare, handler.clone())
        .route(&format!("{bare}/"), handler)
}
