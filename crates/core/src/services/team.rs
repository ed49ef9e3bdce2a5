//! Team service.

use std::collections::HashMap;

use chrono::Utc;
use cozum_common::{AppError, AppResult, IdGenerator};
use cozum_db::{
    entities::{lifecycle::Lifecycle, team, team::TeamType},
    repositories::{TeamRepository, UserRepository, Visibility},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::policy::{Action, Actor, Resource, can};

/// A team with its creator's name and member IDs.
#[derive(Debug, Clone)]
pub struct TeamView {
    pub team: team::Model,
    pub creator_name: Option<String>,
    pub members: Vec<String>,
}

/// Resolve members and creator names for a batch of teams.
pub(crate) async fn team_views(
    team_repo: &TeamRepository,
    user_repo: &UserRepository,
    teams: Vec<team::Model>,
) -> AppResult<Vec<TeamView>> {
    let team_ids: Vec<String> = teams.iter().map(|t| t.id.clone()).collect();
    let mut members = team_repo.member_ids_for(&team_ids).await?;

    let mut creator_ids: Vec<String> = teams.iter().map(|t| t.created_by.clone()).collect();
    creator_ids.sort();
    creator_ids.dedup();
    let creators: HashMap<String, String> = user_repo
        .find_by_ids(&creator_ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u.full_name()))
        .collect();

    Ok(teams
        .into_iter()
        .map(|team| TeamView {
            creator_name: creators.get(&team.created_by).cloned(),
            members: members.remove(&team.id).unwrap_or_default(),
            team,
        })
        .collect())
}

/// Input for creating a team.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Wire value such as `"FIELD_TEAM"`; defaults to a field team.
    pub team_type: Option<String>,

    #[serde(default)]
    pub members: Vec<String>,
}

/// Input for updating a team.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTeamInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub team_type: Option<String>,

    /// Replaces the whole member set when present.
    pub members: Option<Vec<String>>,

    pub is_active: Option<bool>,
}

/// Team service.
#[derive(Clone)]
pub struct TeamService {
    team_repo: TeamRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl TeamService {
    /// Create a new team service.
    #[must_use]
    pub const fn new(team_repo: TeamRepository, user_repo: UserRepository) -> Self {
        Self {
            team_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Active teams, by name.
    pub async fn list(&self) -> AppResult<Vec<TeamView>> {
        let teams = self.team_repo.list(Visibility::ActiveOnly).await?;
        team_views(&self.team_repo, &self.user_repo, teams).await
    }

    /// A single team. Retired teams still resolve.
    pub async fn get(&self, id: &str) -> AppResult<TeamView> {
        let team = self.team_repo.get_by_id(id).await?;
        let members = self.team_repo.member_ids(&team.id).await?;
        let creator_name = self.creator_name(&team.created_by).await?;
        Ok(TeamView {
            team,
            creator_name,
            members,
        })
    }

    /// Create a team, owned by the caller.
    pub async fn create(&self, actor: &Actor, input: CreateTeamInput) -> AppResult<TeamView> {
        can(actor, Action::Create, Resource::Teams).into_result()?;
        input.validate()?;

        let team_type = match input.team_type.as_deref() {
            Some(value) => parse_team_type(value)?,
            None => TeamType::default(),
        };
        let members = self.check_members(input.members).await?;

        let model = team::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            description: Set(input.description),
            team_type: Set(team_type),
            created_by: Set(actor.user_id.clone()),
            lifecycle: Set(Lifecycle::Active),
            created_at: Set(Utc::now().into()),
        };

        let team = self.team_repo.create(model, &members).await?;
        tracing::info!(team_id = %team.id, members = members.len(), "Team created");

        let creator_name = self.creator_name(&team.created_by).await?;
        Ok(TeamView {
            team,
            creator_name,
            members,
        })
    }

    /// Update a team.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        input: UpdateTeamInput,
    ) -> AppResult<TeamView> {
        can(actor, Action::Update, Resource::Teams).into_result()?;
        input.validate()?;

        let team_type = input.team_type.as_deref().map(parse_team_type).transpose()?;
        let team = self.team_repo.get_by_id(id).await?;

        if let Some(members) = input.members {
            let members = self.check_members(members).await?;
            self.team_repo.set_members(&team.id, &members).await?;
        }

        let mut active: team::ActiveModel = team.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(team_type) = team_type {
            active.team_type = Set(team_type);
        }
        if let Some(is_active) = input.is_active {
            active.lifecycle = Set(Lifecycle::from_active(is_active));
        }

        let team = self.team_repo.update(active).await?;
        let members = self.team_repo.member_ids(&team.id).await?;
        let creator_name = self.creator_name(&team.created_by).await?;
        Ok(TeamView {
            team,
            creator_name,
            members,
        })
    }

    /// Retire a team. Members and assigned reports keep pointing at it.
    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        can(actor, Action::Delete, Resource::Teams).into_result()?;

        let team = self.team_repo.get_by_id(id).await?;
        let team = self.team_repo.retire(team).await?;
        tracing::info!(team_id = %team.id, "Team retired");
        Ok(())
    }

    async fn creator_name(&self, user_id: &str) -> AppResult<Option<String>> {
        Ok(self
            .user_repo
            .find_by_id(user_id)
            .await?
            .map(|u| u.full_name()))
    }

    /// Deduplicate member IDs and make sure each one is a real user.
    async fn check_members(&self, mut ids: Vec<String>) -> AppResult<Vec<String>> {
        ids.sort();
        ids.dedup();

        let found: Vec<String> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        let unknown: Vec<&str> = ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::field(
                "members",
                format!("Unknown user IDs: {}", unknown.join(", ")),
            ));
        }

        Ok(ids)
    }
}

fn parse_team_type(value: &str) -> AppResult<TeamType> {
    TeamType::parse(value)
        .ok_or_else(|| AppError::field("team_type", format!("Invalid team type: {value}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cozum_db::entities::{team_member, user, user::Role};
    use cozum_db::test_utils;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn staff_actor() -> Actor {
        Actor::from_user(&test_utils::staff("admin"))
    }

    #[tokio::test]
    async fn test_list_assembles_views() {
        let teams_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    test_utils::team("t1", "Roads crew", "admin"),
                    test_utils::team("t2", "Parks crew", "admin"),
                ]])
                .append_query_results([[team_member::Model {
                    team_id: "t1".to_string(),
                    user_id: "f1".to_string(),
                }]])
                .into_connection(),
        );
        let users_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user::Model {
                    first_name: "Deniz".to_string(),
                    last_name: "Kaya".to_string(),
                    ..test_utils::staff("admin")
                }]])
                .into_connection(),
        );

        let service = TeamService::new(TeamRepository::new(teams_db), UserRepository::new(users_db));
        let views = service.list().await.unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].members, vec!["f1".to_string()]);
        assert!(views[1].members.is_empty());
        assert_eq!(views[0].creator_name.as_deref(), Some("Deniz Kaya"));
    }

    #[tokio::test]
    async fn test_create_with_unknown_member_rejected() {
        let users_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::user("f1", Role::FieldTeam)]])
                .into_connection(),
        );

        let service = TeamService::new(
            TeamRepository::new(test_utils::empty_db()),
            UserRepository::new(users_db),
        );
        let err = service
            .create(
                &staff_actor(),
                CreateTeamInput {
                    name: "Roads crew".to_string(),
                    description: String::new(),
                    team_type: None,
                    members: vec!["f1".to_string(), "ghost".to_string()],
                },
            )
            .await
            .unwrap_err();

        match err {
            AppError::InvalidFields(fields) => {
                assert_eq!(fields["members"], vec!["Unknown user IDs: ghost".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_with_members() {
        let teams_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::team("t1", "Roads crew", "admin")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let users_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::user("f1", Role::FieldTeam)]])
                .append_query_results([[test_utils::staff("admin")]])
                .into_connection(),
        );

        let service = TeamService::new(TeamRepository::new(teams_db), UserRepository::new(users_db));
        let view = service
            .create(
                &staff_actor(),
                CreateTeamInput {
                    name: "Roads crew".to_string(),
                    description: String::new(),
                    team_type: Some("field_team".to_string()),
                    members: vec!["f1".to_string(), "f1".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(view.members, vec!["f1".to_string()]);
        assert_eq!(view.creator_name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn test_invalid_team_type_rejected() {
        let service = TeamService::new(
            TeamRepository::new(test_utils::empty_db()),
            UserRepository::new(test_utils::empty_db()),
        );
        let err = service
            .update(
                &staff_actor(),
                "t1",
                UpdateTeamInput {
                    team_type: Some("SQUAD".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidFields(_)));
    }

    #[tokio::test]
    async fn test_field_team_cannot_delete() {
        let service = TeamService::new(
            TeamRepository::new(test_utils::empty_db()),
            UserRepository::new(test_utils::empty_db()),
        );
        let member = Actor::from_user(&test_utils::user("f1", Role::FieldTeam));

        let err = service.delete(&member, "t1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_retires() {
        let active = test_utils::team("t1", "Roads crew", "admin");
        let retired = team::Model {
            lifecycle: Lifecycle::Retired,
            ..active.clone()
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[active]])
                .append_query_results([[retired]])
                .into_connection(),
        );

        let service = TeamService::new(TeamRepository::new(db), UserRepository::new(test_utils::empty_db()));
        service.delete(&staff_actor(), "t1").await.unwrap();
    }
}
