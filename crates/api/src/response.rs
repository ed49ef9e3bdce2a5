//! API response types.
//!
//! JSON representations shared by several endpoint modules, plus the status
//! wrappers handlers return.

#![allow(missing_docs)]

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, FixedOffset};
use cozum_core::{CommentView, MediaView, ReportDetail, ReportSummary, TeamView, UserView};
use cozum_db::entities::{
    category,
    media::MediaType,
    report::{Priority, ReportStatus},
    team::TeamType,
    user::Role,
};
use serde::Serialize;

use crate::extractors::RequestOrigin;

/// A `201 Created` JSON response.
#[derive(Debug)]
pub struct Created<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// Empty success response.
#[must_use]
pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// `{"detail": ...}` message body.
#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Json<Self> {
        Json(Self {
            detail: detail.into(),
        })
    }
}

/// User detail.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub role_display: &'static str,
    pub team: Option<String>,
    pub team_name: Option<String>,
    pub is_staff: bool,
    pub phone: String,
    pub address: String,
    pub date_joined: DateTime<FixedOffset>,
    pub last_login: Option<DateTime<FixedOffset>>,
}

impl From<UserView> for UserResponse {
    fn from(view: UserView) -> Self {
        let user = view.user;
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            role_display: user.role.display_name(),
            team: user.team_id,
            team_name: view.team_name,
            is_staff: user.is_staff,
            phone: user.phone,
            address: user.address,
            date_joined: user.date_joined,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

impl From<category::Model> for CategoryResponse {
    fn from(category: category::Model) -> Self {
        Self {
            is_active: category.lifecycle.is_active(),
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub team_type: TeamType,
    pub created_by: String,
    pub created_by_name: Option<String>,
    pub members: Vec<String>,
    pub members_count: usize,
    pub created_at: DateTime<FixedOffset>,
    pub is_active: bool,
}

impl From<TeamView> for TeamResponse {
    fn from(view: TeamView) -> Self {
        let team = view.team;
        Self {
            is_active: team.lifecycle.is_active(),
            id: team.id,
            name: team.name,
            description: team.description,
            team_type: team.team_type,
            created_by: team.created_by,
            created_by_name: view.creator_name,
            members_count: view.members.len(),
            members: view.members,
            created_at: team.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: String,
    /// Absolute URL.
    pub file: String,
    pub file_path: String,
    pub file_size: i64,
    pub media_type: MediaType,
    pub uploaded_at: DateTime<FixedOffset>,
}

impl MediaResponse {
    pub fn new(view: MediaView, origin: &RequestOrigin) -> Self {
        Self {
            file: origin.absolute(&view.url),
            id: view.media.id,
            file_path: view.media.file_path,
            file_size: view.media.file_size,
            media_type: view.media.media_type,
            uploaded_at: view.media.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub user: UserResponse,
    pub content: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self {
            id: view.comment.id,
            user: view.author.into(),
            content: view.comment.content,
            created_at: view.comment.created_at,
        }
    }
}

/// Report as listed.
#[derive(Debug, Serialize)]
pub struct ReportSummaryResponse {
    pub id: String,
    pub title: String,
    pub status: ReportStatus,
    pub priority: Priority,
    pub reporter: UserResponse,
    pub category: CategoryResponse,
    pub assigned_team: Option<TeamResponse>,
    pub location: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub media_count: usize,
    pub comment_count: u64,
    pub first_media_url: Option<String>,
}

impl ReportSummaryResponse {
    pub fn new(summary: ReportSummary, origin: &RequestOrigin) -> Self {
        let report = summary.report;
        Self {
            id: report.id,
            title: report.title,
            status: report.status,
            priority: report.priority,
            reporter: summary.reporter.into(),
            category: summary.category.into(),
            assigned_team: summary.assigned_team.map(Into::into),
            location: report.location,
            created_at: report.created_at,
            updated_at: report.updated_at,
            media_count: summary.media_count,
            comment_count: summary.comment_count,
            first_media_url: summary.first_media_url.map(|url| origin.absolute(&url)),
        }
    }
}

/// Report with media and comments.
#[derive(Debug, Serialize)]
pub struct ReportDetailResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: ReportStatus,
    pub priority: Priority,
    pub reporter: UserResponse,
    pub category: CategoryResponse,
    pub assigned_team: Option<TeamResponse>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub media_files: Vec<MediaResponse>,
    pub comments: Vec<CommentResponse>,
}

impl ReportDetailResponse {
    pub fn new(detail: ReportDetail, origin: &RequestOrigin) -> Self {
        let report = detail.report;
        Self {
            id: report.id,
            title: report.title,
            description: report.description,
            status: report.status,
            priority: report.priority,
            reporter: detail.reporter.into(),
            category: detail.category.into(),
            assigned_team: detail.assigned_team.map(Into::into),
            location: report.location,
            latitude: report.latitude,
            longitude: report.longitude,
            created_at: report.created_at,
            updated_at: report.updated_at,
            media_files: detail
                .media
                .into_iter()
                .map(|m| MediaResponse::new(m, origin))
                .collect(),
            comments: detail.comments.into_iter().map(Into::into).collect(),
        }
    }
}
