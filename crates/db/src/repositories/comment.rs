//! Report comment repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{Comment, comment};
use cozum_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect,
};

#[derive(Debug, FromQueryResult)]
struct CommentCount {
    report_id: String,
    count: i64,
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment: {id}")))
    }

    /// Comments on a report, newest first.
    pub async fn find_by_report(&self, report_id: &str) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::ReportId.eq(report_id))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of comments per report. Reports without comments are absent.
    pub async fn count_by_reports(&self, report_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if report_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Comment::find()
            .select_only()
            .column(comment::Column::ReportId)
            .column_as(comment::Column::Id.count(), "count")
            .filter(comment::Column::ReportId.is_in(report_ids.to_vec()))
            .group_by(comment::Column::ReportId)
            .into_model::<CommentCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.report_id, row.count.max(0) as u64))
            .collect())
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Comment::delete_by_id(id)
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
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_find_by_report() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    test_utils::comment("c2", "r1", "u1"),
                    test_utils::comment("c1", "r1", "u2"),
                ]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_report("r1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "c2");
    }

    #[tokio::test]
    async fn test_count_by_reports() {
        let row = |report_id: &str, count: i64| {
            BTreeMap::from([
                ("report_id", Value::from(report_id)),
                ("count", Value::from(count)),
            ])
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![row("r1", 3), row("r2", 1)]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let counts = repo
            .count_by_reports(&["r1".to_string(), "r2".to_string(), "r3".to_string()])
            .await
            .unwrap();

        assert_eq!(counts["r1"], 3);
        assert_eq!(counts["r2"], 1);
        assert!(!counts.contains_key("r3"));
    }
}
