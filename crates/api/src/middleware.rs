//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cozum_common::{AppError, SharedStorage};
use cozum_core::{
    AccountService, CategoryService, CommentService, ReportService, TeamService, UserService,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub user_service: UserService,
    pub category_service: CategoryService,
    pub team_service: TeamService,
    pub report_service: ReportService,
    pub comment_service: CommentService,
    pub storage: SharedStorage,
    pub db: Arc<DatabaseConnection>,
    /// Public base URL, used when a request carries no `Host` header.
    pub server_url: String,
}

/// Why a presented bearer token was not accepted.
#[derive(Debug, Clone)]
pub struct TokenRejection(pub String);

/// Authentication middleware.
///
/// A valid access token puts the user into the request extensions; an
/// invalid one leaves a [`TokenRejection`] behind for the extractor. Any
/// other failure while checking the token ends the request with that error.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    if let Some(token) = token {
        match state.account_service.authenticate(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(AppError::InvalidToken(reason)) => {
                tracing::debug!(reason = %reason, "Rejected bearer token");
                req.extensions_mut().insert(TokenRejection(reason));
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}
