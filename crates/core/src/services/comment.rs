//! Comment service.

use std::collections::HashMap;

use chrono::Utc;
use cozum_common::{AppError, AppResult, IdGenerator};
use cozum_db::{
    entities::{comment, user},
    repositories::{CommentRepository, ReportRepository, TeamRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;

use super::user::{UserView, user_view, user_views};
use crate::policy::{Action, Actor, Resource, can};

/// A comment with its author.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: comment::Model,
    pub author: UserView,
}

/// Input for creating or editing a comment.
#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub content: String,
}

impl CommentInput {
    fn content(self) -> AppResult<String> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::field("content", "This field may not be blank."));
        }
        Ok(content.to_string())
    }
}

/// Comment service.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    report_repo: ReportRepository,
    user_repo: UserRepository,
    team_repo: TeamRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        report_repo: ReportRepository,
        user_repo: UserRepository,
        team_repo: TeamRepository,
    ) -> Self {
        Self {
            comment_repo,
            report_repo,
            user_repo,
            team_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comments on a report, newest first.
    pub async fn list_for_report(&self, report_id: &str) -> AppResult<Vec<CommentView>> {
        let report = self.report_repo.get_by_id(report_id).await?;
        self.for_report(&report.id).await
    }

    /// Comments on a report the caller has already loaded.
    pub(crate) async fn for_report(&self, report_id: &str) -> AppResult<Vec<CommentView>> {
        let comments = self.comment_repo.find_by_report(report_id).await?;
        self.views(comments).await
    }

    /// Comment on a report as `author`.
    pub async fn create(
        &self,
        author: &user::Model,
        report_id: &str,
        input: CommentInput,
    ) -> AppResult<CommentView> {
        let report = self.report_repo.get_by_id(report_id).await?;
        let actor = Actor::from_user(author);
        can(&actor, Action::Create, Resource::CommentThread(&report)).into_result()?;

        let content = input.content()?;
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            report_id: Set(report.id.clone()),
            user_id: Set(author.id.clone()),
            content: Set(content),
            created_at: Set(Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, report_id = %report.id, "Comment added");

        let author = user_view(&self.team_repo, author.clone()).await?;
        Ok(CommentView { comment, author })
    }

    /// A single comment.
    pub async fn get(&self, id: &str) -> AppResult<CommentView> {
        let comment = self.comment_repo.get_by_id(id).await?;
        self.view(comment).await
    }

    /// Edit a comment's content.
    pub async fn update(&self, actor: &Actor, id: &str, input: CommentInput) -> AppResult<CommentView> {
        let comment = self.comment_repo.get_by_id(id).await?;
        can(actor, Action::Update, Resource::Comment(&comment)).into_result()?;

        let content = input.content()?;
        let mut active: comment::ActiveModel = comment.into();
        active.content = Set(content);

        let comment = self.comment_repo.update(active).await?;
        self.view(comment).await
    }

    /// Delete a comment.
    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        can(actor, Action::Delete, Resource::Comment(&comment)).into_result()?;

        self.comment_repo.delete(&comment.id).await?;
        tracing::info!(comment_id = %comment.id, "Comment deleted");
        Ok(())
    }

    async fn view(&self, comment: comment::Model) -> AppResult<CommentView> {
        let author = self.user_repo.get_by_id(&comment.user_id).await?;
        let author = user_view(&self.team_repo, author).await?;
        Ok(CommentView { comment, author })
    }

    async fn views(&self, comments: Vec<comment::Model>) -> AppResult<Vec<CommentView>> {
        let mut author_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors = self.user_repo.find_by_ids(&author_ids).await?;
        let authors: HashMap<String, UserView> = user_views(&self.team_repo, authors)
            .await?
            .into_iter()
            .map(|v| (v.user.id.clone(), v))
            .collect();

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.user_id).cloned()?;
                Some(CommentView { comment, author })
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cozum_db::entities::{report, user::Role};
    use cozum_db::test_utils;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(
        comments: Arc<DatabaseConnection>,
        reports: Arc<DatabaseConnection>,
        users: Arc<DatabaseConnection>,
    ) -> CommentService {
        CommentService::new(
            CommentRepository::new(comments),
            ReportRepository::new(reports),
            UserRepository::new(users),
            TeamRepository::new(test_utils::empty_db()),
        )
    }

    fn reports_db(report: report::Model) -> Arc<DatabaseConnection> {
        Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[report]])
                .into_connection(),
        )
    }

    #[tokio::test]
    async fn test_missing_report_is_not_found() {
        let reports = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<report::Model>::new()])
                .into_connection(),
        );
        let service = service(test_utils::empty_db(), reports, test_utils::empty_db());

        let err = service.list_for_report("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_citizen_cannot_comment_on_foreign_report() {
        let report = test_utils::report("r1", "someone-else", "c1");
        let service = service(
            test_utils::empty_db(),
            reports_db(report),
            test_utils::empty_db(),
        );
        let citizen = test_utils::user("u1", Role::Citizen);

        let err = service
            .create(
                &citizen,
                "r1",
                CommentInput {
                    content: "Any news?".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let report = test_utils::report("r1", "u1", "c1");
        let service = service(
            test_utils::empty_db(),
            reports_db(report),
            test_utils::empty_db(),
        );
        let citizen = test_utils::user("u1", Role::Citizen);

        let err = service
            .create(
                &citizen,
                "r1",
                CommentInput {
                    content: "   ".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidFields(_)));
    }

    #[tokio::test]
    async fn test_field_team_comments_on_any_report() {
        let report = test_utils::report("r1", "u1", "c1");
        let comment = comment::Model {
            content: "Crew dispatched".to_string(),
            ..test_utils::comment("cm1", "r1", "f1")
        };
        let comments = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment]])
                .into_connection(),
        );
        let service = service(comments, reports_db(report), test_utils::empty_db());
        let member = test_utils::user("f1", Role::FieldTeam);

        let view = service
            .create(
                &member,
                "r1",
                CommentInput {
                    content: "  Crew dispatched ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.comment.content, "Crew dispatched");
        assert_eq!(view.author.user.id, "f1");
    }

    #[tokio::test]
    async fn test_list_attaches_authors() {
        let report = test_utils::report("r1", "u1", "c1");
        let comments = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    test_utils::comment("cm2", "r1", "f1"),
                    test_utils::comment("cm1", "r1", "u1"),
                ]])
                .into_connection(),
        );
        let users = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    test_utils::user("f1", Role::FieldTeam),
                    test_utils::user("u1", Role::Citizen),
                ]])
                .into_connection(),
        );
        let service = service(comments, reports_db(report), users);

        let views = service.list_for_report("r1").await.unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].comment.id, "cm2");
        assert_eq!(views[0].author.user.role, Role::FieldTeam);
        assert_eq!(views[1].author.user.id, "u1");
    }

    #[tokio::test]
    async fn test_other_citizen_cannot_delete() {
        let comments = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::comment("cm1", "r1", "u1")]])
                .into_connection(),
        );
        let service = service(comments, test_utils::empty_db(), test_utils::empty_db());
        let other = Actor::from_user(&test_utils::user("u2", Role::Citizen));

        let err = service.delete(&other, "cm1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_operator_deletes_any_comment() {
        let comments = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_utils::comment("cm1", "r1", "u1")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = service(comments, test_utils::empty_db(), test_utils::empty_db());
        let operator = Actor::from_user(&test_utils::user("o1", Role::Operator));

        service.delete(&operator, "cm1").await.unwrap();
    }
}
