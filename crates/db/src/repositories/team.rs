//! Team repository.

use std::collections::HashMap;
use std::sync::Arc;

use super::Visibility;
use crate::entities::{Team, TeamMember, lifecycle::Lifecycle, team, team_member};
use cozum_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

/// Team repository for database operations.
#[derive(Clone)]
pub struct TeamRepository {
    db: Arc<DatabaseConnection>,
}

impl TeamRepository {
    /// Create a new team repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a team by ID, retired or not.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<team::Model>> {
        Team::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a team by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<team::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team: {id}")))
    }

    /// Find teams by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<team::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Team::find()
            .filter(team::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List teams ordered by name.
    pub async fn list(&self, visibility: Visibility) -> AppResult<Vec<team::Model>> {
        Team::find()
            .filter(visibility.condition(team::Column::Lifecycle))
            .order_by_asc(team::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a team together with its member rows.
    pub async fn create(
        &self,
        model: team::ActiveModel,
        member_ids: &[String],
    ) -> AppResult<team::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let team = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        insert_members(&txn, &team.id, member_ids).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(team)
    }

    /// Update a team.
    pub async fn update(&self, model: team::ActiveModel) -> AppResult<team::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the member set of a team.
    pub async fn set_members(&self, team_id: &str, member_ids: &[String]) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        TeamMember::delete_many()
            .filter(team_member::Column::TeamId.eq(team_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        insert_members(&txn, team_id, member_ids).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Member IDs of a team.
    pub async fn member_ids(&self, team_id: &str) -> AppResult<Vec<String>> {
        let rows = TeamMember::find()
            .filter(team_member::Column::TeamId.eq(team_id))
            .order_by_asc(team_member::Column::UserId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }

    /// Member IDs for several teams at once, keyed by team ID.
    pub async fn member_ids_for(
        &self,
        team_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<String>>> {
        if team_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = TeamMember::find()
            .filter(team_member::Column::TeamId.is_in(team_ids.to_vec()))
            .order_by_asc(team_member::Column::UserId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            members.entry(row.team_id).or_default().push(row.user_id);
        }
        Ok(members)
    }

    /// Soft-delete a team. Retiring a retired team is a no-op.
    pub async fn retire(&self, team: team::Model) -> AppResult<team::Model> {
        if team.lifecycle == Lifecycle::Retired {
            return Ok(team);
        }

        let mut active: team::ActiveModel = team.into();
        active.lifecycle = Set(Lifecycle::Retired);
        self.update(active).await
    }
}

async fn insert_members(
    txn: &DatabaseTransaction,
    team_id: &str,
    member_ids: &[String],
) -> AppResult<()> {
    if member_ids.is_empty() {
        return Ok(());
    }

    let rows = member_ids.iter().map(|user_id| team_member::ActiveModel {
        team_id: Set(team_id.to_string()),
        user_id: Set(user_id.clone()),
    });

    TeamMember::insert_many(rows)
        .exec_without_returning(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_create_with_members() {
        let team = test_utils::team("t1", "Roads crew", "admin");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[team.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = TeamRepository::new(db);
        let active = team::ActiveModel {
            id: Set(team.id.clone()),
            name: Set(team.name.clone()),
            description: Set(String::new()),
            team_type: Set(team::TeamType::FieldTeam),
            created_by: Set("admin".to_string()),
            lifecycle: Set(Lifecycle::Active),
            created_at: Set(team.created_at),
        };
        let result = repo
            .create(active, &["u1".to_string(), "u2".to_string()])
            .await
            .unwrap();

        assert_eq!(result.id, "t1");
    }

    #[tokio::test]
    async fn test_member_ids_for_groups_by_team() {
        let rows = vec![
            team_member::Model {
                team_id: "t1".to_string(),
                user_id: "u1".to_string(),
            },
            team_member::Model {
                team_id: "t2".to_string(),
                user_id: "u2".to_string(),
            },
            team_member::Model {
                team_id: "t1".to_string(),
                user_id: "u3".to_string(),
            },
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = TeamRepository::new(db);
        let members = repo
            .member_ids_for(&["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();

        assert_eq!(members["t1"], vec!["u1".to_string(), "u3".to_string()]);
        assert_eq!(members["t2"], vec!["u2".to_string()]);
    }

    #[tokio::test]
    async fn test_set_members_replaces() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 3,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = TeamRepository::new(db);
        repo.set_members("t1", &["u9".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_retire_already_retired_is_noop() {
        let team = team::Model {
            lifecycle: Lifecycle::Retired,
            ..test_utils::team("t1", "Roads crew", "admin")
        };

        let repo = TeamRepository::new(test_utils::empty_db());
        let result = repo.retire(team).await.unwrap();

        assert_eq!(result.lifecycle, Lifecycle::Retired);
    }
}
