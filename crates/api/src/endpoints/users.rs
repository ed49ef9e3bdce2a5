//! User administration endpoints (staff only).

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use cozum_common::AppResult;
use cozum_core::{CreateUserInput, UpdateUserInput};
use serde::Deserialize;

use super::route;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Created, UserResponse},
};

async fn list(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.user_service.list(&user.actor()).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateUserInput>,
) -> AppResult<Created<UserResponse>> {
    let created = state.user_service.create(&user.actor(), req).await?;
    Ok(Created(created.into()))
}

async fn show(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let found = state.user_service.get(&user.actor(), &id).await?;
    Ok(Json(found.into()))
}

async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserInput>,
) -> AppResult<Json<UserResponse>> {
    let updated = state.user_service.update(&user.actor(), &id, req).await?;
    Ok(Json(updated.into()))
}

/// Set role request.
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

async fn set_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let updated = state
        .user_service
        .set_role(&user.actor(), &id, &req.role)
        .await?;
    Ok(Json(updated.into()))
}

/// Set team request. A missing or `null` team clears the assignment.
#[derive(Debug, Deserialize)]
pub struct SetTeamRequest {
    #[serde(default)]
    pub team: Option<String>,
}

async fn set_team(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetTeamRequest>,
) -> AppResult<Json<UserResponse>> {
    let updated = state
        .user_service
        .set_team(&user.actor(), &id, req.team.as_deref())
        .await?;
    Ok(Json(updated.into()))
}

pub fn router() -> Router<AppState> {
    let router = route(Router::new(), "/users", get(list).post(create));
    let router = route(router, "/users/{id}", get(show).patch(update).put(update));
    let router = route(router, "/users/{id}/set_role", post(set_role));
    route(router, "/users/{id}/set_team", post(set_team))
}
