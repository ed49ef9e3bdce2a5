//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use cozum_common::AppResult;
use cozum_core::CommentInput;

use super::route;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{CommentResponse, no_content},
};

async fn show(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state.comment_service.get(&id).await?;
    Ok(Json(comment.into()))
}

async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommentInput>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .comment_service
        .update(&user.actor(), &id, req)
        .await?;
    Ok(Json(comment.into()))
}

async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.comment_service.delete(&user.actor(), &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    route(
        Router::new(),
        "/comments/{id}",
        get(show).patch(update).put(update).delete(delete),
    )
}
