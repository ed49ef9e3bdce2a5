//! Report media repository.

use std::sync::Arc;

use crate::entities::{Media, media};
use cozum_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Media repository for database operations.
#[derive(Clone)]
pub struct MediaRepository {
    db: Arc<DatabaseConnection>,
}

impl MediaRepository {
    /// Create a new media repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Media of one report in upload order.
    pub async fn find_by_report(&self, report_id: &str) -> AppResult<Vec<media::Model>> {
        Media::find()
            .filter(media::Column::ReportId.eq(report_id))
            .order_by_asc(media::Column::UploadedAt)
            .order_by_asc(media::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Media of several reports in upload order.
    pub async fn find_by_reports(&self, report_ids: &[String]) -> AppResult<Vec<media::Model>> {
        if report_ids.is_empty() {
            return Ok(vec![]);
        }

        Media::find()
            .filter(media::Column::ReportId.is_in(report_ids.to_vec()))
            .order_by_asc(media::Column::UploadedAt)
            .order_by_asc(media::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_report() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::media("m1", "r1")]])
                .into_connection(),
        );

        let repo = MediaRepository::new(db);
        let result = repo.find_by_report("r1").await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].file_path, "reports/2025/06/01/r1/photo.jpg");
    }

    #[tokio::test]
    async fn test_find_by_reports_empty() {
        let repo = MediaRepository::new(test_utils::empty_db());
        assert!(repo.find_by_reports(&[]).await.unwrap().is_empty());
    }
}
