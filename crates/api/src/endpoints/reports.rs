//! Report endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    response::IntoResponse,
    routing::get,
};
use cozum_common::{AppError, AppResult};
use cozum_core::{CommentInput, ListScope, NewReport, UpdateReportInput, UploadedFile};
use serde::Deserialize;

use super::route;
use crate::{
    extractors::{AuthUser, RequestOrigin},
    middleware::AppState,
    response::{
        CommentResponse, Created, ReportDetailResponse, ReportSummaryResponse, no_content,
    },
};

/// Multipart field names accepted for uploaded files.
const FILE_FIELDS: &[&str] = &[
    "media_files",
    "media_files[]",
    "media",
    "files",
    "file",
    "image",
    "images",
];

/// List query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub scope: Option<String>,
    pub tasks_only: Option<String>,
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// List reports visible to the caller.
async fn list(
    user: AuthUser,
    State(state): State<AppState>,
    origin: RequestOrigin,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReportSummaryResponse>>> {
    let scope = ListScope::parse(query.scope.as_deref());
    let tasks_only = is_truthy(query.tasks_only.as_deref());

    let reports = state
        .report_service
        .list(&user.actor(), scope, tasks_only)
        .await?;

    Ok(Json(
        reports
            .into_iter()
            .map(|r| ReportSummaryResponse::new(r, &origin))
            .collect(),
    ))
}

/// File a new report (multipart).
async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    origin: RequestOrigin,
    multipart: Multipart,
) -> AppResult<Created<ReportDetailResponse>> {
    let (input, files) = read_report_form(multipart).await?;

    let detail = state
        .report_service
        .create(&user.actor(), input, files)
        .await?;

    Ok(Created(ReportDetailResponse::new(detail, &origin)))
}

async fn read_report_form(mut multipart: Multipart) -> AppResult<(NewReport, Vec<UploadedFile>)> {
    let mut input = NewReport::default();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if FILE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let data = field.bytes().await.map_err(multipart_error)?;
            if data.is_empty() {
                return Err(AppError::field(
                    "media_files",
                    format!("The submitted file is empty: {file_name}"),
                ));
            }
            files.push(UploadedFile {
                file_name,
                data: data.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "title" => input.title = value,
            "description" => input.description = value,
            "category" | "category_id" => input.category_id = value.trim().to_string(),
            "location" => input.location = Some(value),
            "latitude" => input.latitude = parse_coordinate("latitude", &value)?,
            "longitude" => input.longitude = parse_coordinate("longitude", &value)?,
            _ => {}
        }
    }

    if input.category_id.is_empty() {
        return Err(AppError::field("category", "This field is required."));
    }

    Ok((input, files))
}

fn parse_coordinate(field: &str, value: &str) -> AppResult<Option<f64>> {
    let value = value.trim();
    if value.is_empty() || value == "null" {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| AppError::field(field, "A valid number is required."))
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
}

/// Get a report with media and comments.
async fn show(
    _user: AuthUser,
    State(state): State<AppState>,
    origin: RequestOrigin,
    Path(id): Path<String>,
) -> AppResult<Json<ReportDetailResponse>> {
    let detail = state.report_service.get(&id).await?;
    Ok(Json(ReportDetailResponse::new(detail, &origin)))
}

/// Update status, priority or assignment.
async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    origin: RequestOrigin,
    Path(id): Path<String>,
    Json(req): Json<UpdateReportInput>,
) -> AppResult<Json<ReportDetailResponse>> {
    let detail = state
        .report_service
        .update(&user.actor(), &id, req)
        .await?;
    Ok(Json(ReportDetailResponse::new(detail, &origin)))
}

/// Delete a report.
async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.report_service.delete(&user.actor(), &id).await?;
    Ok(no_content())
}

/// Comments on a report.
async fn list_comments(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let comments = state.comment_service.list_for_report(&id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

/// Comment on a report.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommentInput>,
) -> AppResult<Created<CommentResponse>> {
    let comment = state.comment_service.create(&user, &id, req).await?;
    Ok(Created(comment.into()))
}

pub fn router() -> Router<AppState> {
    let router = route(Router::new(), "/reports", get(list).post(create));
    let router = route(
        router,
        "/reports/{id}",
        get(show).patch(update).put(update).delete(delete),
    );
    route(
        router,
        "/reports/{id}/comments",
        get(list_comments).post(create_comment),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(Some("true")));
        assert!(is_truthy(Some(" 1 ")));
        assert!(is_truthy(Some("Yes")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(Some("")));
        assert!(!is_truthy(None));
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("latitude", "41.0082").ok(), Some(Some(41.0082)));
        assert_eq!(parse_coordinate("latitude", "").ok(), Some(None));
        assert_eq!(parse_coordinate("latitude", "null").ok(), Some(None));
        assert!(parse_coordinate("latitude", "north").is_err());
    }
}
