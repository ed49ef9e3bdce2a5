//! Report repository.

use std::sync::Arc;

use crate::entities::{Report, media, report};
use cozum_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

/// Row filter for report listings.
///
/// Each populated field narrows the result; an empty filter matches every
/// report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Only reports filed by this user.
    pub reporter_id: Option<String>,
    /// Only reports assigned to this team.
    pub assigned_team_id: Option<String>,
    /// Exclude resolved and rejected reports.
    pub open_only: bool,
}

impl ReportFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(reporter_id) = &self.reporter_id {
            cond = cond.add(report::Column::ReporterId.eq(reporter_id.as_str()));
        }
        if let Some(team_id) = &self.assigned_team_id {
            cond = cond.add(report::Column::AssignedTeamId.eq(team_id.as_str()));
        }
        if self.open_only {
            cond = cond.add(report::Column::Status.is_not_in([
                report::ReportStatus::Resolved,
                report::ReportStatus::Rejected,
            ]));
        }
        cond
    }
}

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report: {id}")))
    }

    /// Reports matching `filter`, newest first.
    pub async fn list(&self, filter: &ReportFilter) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(filter.condition())
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a report and its media rows in one transaction.
    ///
    /// Either every row is written or none is.
    pub async fn create_with_media(
        &self,
        report: report::ActiveModel,
        media: Vec<media::ActiveModel>,
    ) -> AppResult<(report::Model, Vec<media::Model>)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let report = report
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut stored = Vec::with_capacity(media.len());
        for item in media {
            let model = item
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            stored.push(model);
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((report, stored))
    }

    /// Update a report.
    pub async fn update(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a report. Media and comments go with it.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Report::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils;
    use sea_orm::{DatabaseBackend, DbErr, IntoActiveModel, MockDatabase, MockExecResult};

    #[test]
    fn test_empty_filter_has_no_conditions() {
        assert!(ReportFilter::default().condition().is_empty());
    }

    #[test]
    fn test_filter_combines_conditions() {
        let filter = ReportFilter {
            reporter_id: None,
            assigned_team_id: Some("t1".to_string()),
            open_only: true,
        };
        assert_eq!(filter.condition().len(), 2);
    }

    #[tokio::test]
    async fn test_list_returns_rows() {
        let r1 = test_utils::report("r1", "u1", "c1");
        let r2 = test_utils::report("r2", "u1", "c1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r2, r1]])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let filter = ReportFilter {
            reporter_id: Some("u1".to_string()),
            ..Default::default()
        };
        let result = repo.list(&filter).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "r2");
    }

    #[tokio::test]
    async fn test_create_with_media_commits_all_rows() {
        let report = test_utils::report("r1", "u1", "c1");
        let m1 = test_utils::media("m1", "r1");
        let m2 = test_utils::media("m2", "r1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[report.clone()]])
                .append_query_results([[m1.clone()]])
                .append_query_results([[m2.clone()]])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let (created, media) = repo
            .create_with_media(
                report.into_active_model(),
                vec![
                    m1.into_active_model(),
                    m2.into_active_model(),
                ],
            )
            .await
            .unwrap();

        assert_eq!(created.id, "r1");
        assert_eq!(media.len(), 2);
    }

    #[tokio::test]
    async fn test_create_with_media_failure_rolls_back() {
        let report = test_utils::report("r1", "u1", "c1");
        let m1 = test_utils::media("m1", "r1");
        let m2 = test_utils::media("m2", "r1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[report.clone()]])
                .append_query_results([[m1.clone()]])
                .append_query_errors([DbErr::Custom("disk full".to_string())])
                .into_connection(),
        );

        let repo = ReportRepository::new(Arc::clone(&db));
        let err = repo
            .create_with_media(
                report.into_active_model(),
                vec![m1.into_active_model(), m2.into_active_model()],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        drop(repo);
        let log = format!(
            "{:?}",
            Arc::try_unwrap(db).unwrap().into_transaction_log()
        );
        assert!(log.contains("ROLLBACK"), "{log}");
        assert!(!log.contains("COMMIT"), "{log}");
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        repo.delete("r1").await.unwrap();
    }
}
