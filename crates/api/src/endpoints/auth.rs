//! Authentication and self-service account endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, post},
};
use cozum_common::AppResult;
use cozum_core::{ChangePasswordInput, RegisterInput, UpdateProfileInput};
use serde::{Deserialize, Serialize};

use super::route;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Created, Detail, UserResponse},
};

/// Create a new citizen account.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> AppResult<Created<UserResponse>> {
    let user = state.account_service.register(req).await?;
    Ok(Created(user.into()))
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response.
#[derive(Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

/// Exchange credentials for a token pair.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let pair = state
        .account_service
        .login(&req.email, &req.password)
        .await?;

    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

/// Refresh request.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh response.
#[derive(Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Exchange a refresh token for a new access token.
async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let access = state.account_service.refresh(&req.refresh).await?;
    Ok(Json(RefreshResponse { access }))
}

/// Get current user.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let view = state.account_service.me(user).await?;
    Ok(Json(view.into()))
}

/// Update current user's profile.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileInput>,
) -> AppResult<Json<UserResponse>> {
    let view = state.account_service.update_me(user, req).await?;
    Ok(Json(view.into()))
}

/// Change current user's password.
async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChangePasswordInput>,
) -> AppResult<Json<Detail>> {
    state.account_service.change_password(user, req).await?;
    Ok(Detail::new("Password updated successfully."))
}

pub fn router() -> Router<AppState> {
    let router = Router::new();
    let router = route(router, "/auth/register", post(register));
    let router = route(router, "/auth/login", post(login));
    let router = route(router, "/auth/refresh", post(refresh));
    let router = route(router, "/auth/me", get(me));
    let router = route(router, "/auth/me/update", patch(update_me).put(update_me));
    route(
        router,
        "/auth/password/change",
        patch(change_password).put(change_password),
    )
}
