//! Team endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use cozum_common::AppResult;
use cozum_core::{CreateTeamInput, UpdateTeamInput};

use super::route;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Created, TeamResponse, no_content},
};

async fn list(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TeamResponse>>> {
    let teams = state.team_service.list().await?;
    Ok(Json(teams.into_iter().map(Into::into).collect()))
}

async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateTeamInput>,
) -> AppResult<Created<TeamResponse>> {
    let team = state.team_service.create(&user.actor(), req).await?;
    Ok(Created(team.into()))
}

async fn show(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TeamResponse>> {
    let team = state.team_service.get(&id).await?;
    Ok(Json(team.into()))
}

async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTeamInput>,
) -> AppResult<Json<TeamResponse>> {
    let team = state.team_service.update(&user.actor(), &id, req).await?;
    Ok(Json(team.into()))
}

async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.team_service.delete(&user.actor(), &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    let router = route(Router::new(), "/teams", get(list).post(create));
    route(
        router,
        "/teams/{id}",
        get(show).patch(update).put(update).delete(delete),
    )
}
