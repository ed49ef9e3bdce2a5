//! Category endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use cozum_common::AppResult;
use cozum_core::{CreateCategoryInput, UpdateCategoryInput};

use super::route;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{CategoryResponse, Created, no_content},
};

/// List active categories.
async fn list(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CategoryResponse>>> {
    let categories = state.category_service.list().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// Create a category (staff only).
async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryInput>,
) -> AppResult<Created<CategoryResponse>> {
    let category = state.category_service.create(&user.actor(), req).await?;
    Ok(Created(category.into()))
}

/// Get a category.
async fn show(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CategoryResponse>> {
    let category = state.category_service.get(&id).await?;
    Ok(Json(category.into()))
}

/// Update a category (staff only).
async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCategoryInput>,
) -> AppResult<Json<CategoryResponse>> {
    let category = state
        .category_service
        .update(&user.actor(), &id, req)
        .await?;
    Ok(Json(category.into()))
}

/// Retire a category (staff only).
async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.category_service.delete(&user.actor(), &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    let router = route(Router::new(), "/categories", get(list).post(create));
    route(
        router,
        "/categories/{id}",
        get(show).patch(update).put(update).delete(delete),
    )
}
