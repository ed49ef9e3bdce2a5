//! Test utilities for database operations.
//!
//! Model builders with sensible defaults, shared by repository, service and
//! API tests that run against `sea_orm::MockDatabase`.

use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use std::sync::Arc;

use crate::entities::{category, comment, lifecycle::Lifecycle, media, report, team, user};

/// An empty Postgres-flavoured mock connection.
#[must_use]
pub fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

/// A user with the given role and no team.
#[must_use]
pub fn user(id: &str, role: user::Role) -> user::Model {
    user::Model {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        username: id.to_string(),
        password_hash: String::new(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role,
        is_staff: false,
        team_id: None,
        phone: String::new(),
        address: String::new(),
        date_joined: Utc::now().into(),
        last_login: None,
    }
}

/// A staff administrator.
#[must_use]
pub fn staff(id: &str) -> user::Model {
    user::Model {
        is_staff: true,
        ..user(id, user::Role::Admin)
    }
}

/// An active category.
#[must_use]
pub fn category(id: &str, name: &str) -> category::Model {
    category::Model {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        lifecycle: Lifecycle::Active,
        created_at: Utc::now().into(),
    }
}

/// An active field team.
#[must_use]
pub fn team(id: &str, name: &str, created_by: &str) -> team::Model {
    team::Model {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        team_type: team::TeamType::FieldTeam,
        created_by: created_by.to_string(),
        lifecycle: Lifecycle::Active,
        created_at: Utc::now().into(),
    }
}

/// A pending, unassigned report.
#[must_use]
pub fn report(id: &str, reporter_id: &str, category_id: &str) -> report::Model {
    let now = Utc::now();
    report::Model {
        id: id.to_string(),
        title: "Pothole".to_string(),
        description: "Deep pothole on the main road".to_string(),
        status: report::ReportStatus::Pending,
        priority: report::Priority::Medium,
        reporter_id: reporter_id.to_string(),
        category_id: category_id.to_string(),
        assigned_team_id: None,
        location: None,
        latitude: None,
        longitude: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// A stored JPEG attached to a report.
#[must_use]
pub fn media(id: &str, report_id: &str) -> media::Model {
    media::Model {
        id: id.to_string(),
        report_id: report_id.to_string(),
        file_name: "photo.jpg".to_string(),
        file_path: format!("reports/2025/06/01/{report_id}/photo.jpg"),
        file_size: 1024,
        content_type: "image/jpeg".to_string(),
        media_type: media::MediaType::Image,
        uploaded_at: Utc::now().into(),
    }
}

/// A comment on a report.
#[must_use]
pub fn comment(id: &str, report_id: &str, user_id: &str) -> comment::Model {
    comment::Model {
        id: id.to_string(),
        report_id: report_id.to_string(),
        user_id: user_id.to_string(),
        content: "On it".to_string(),
        created_at: Utc::now().into(),
    }
}
