//! Report service: listing, the creation pipeline, triage updates and
//! deletion.
//!
//! Creation stores every upload before touching the database, then writes
//! the report and its media rows in one transaction. When anything fails the
//! already-stored objects are removed again, so a failed request leaves
//! neither rows nor files behind.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use cozum_common::{AppError, AppResult, IdGenerator, SharedStorage, sanitize_file_name};
use cozum_db::{
    entities::{
        category, media,
        media::MediaType,
        report,
        report::{Priority, ReportStatus},
    },
    repositories::{
        CategoryRepository, CommentRepository, MediaRepository, ReportRepository, TeamRepository,
        UserRepository,
    },
};
use sea_orm::Set;
use serde::{Deserialize, Deserializer};
use validator::Validate;

use super::comment::{CommentService, CommentView};
use super::media::MediaService;
use super::team::{TeamView, team_views};
use super::user::{UserView, user_views};
use crate::policy::{Action, Actor, ListScope, Resource, can, report_filter};

/// A stored media row with the URL it is served from.
#[derive(Debug, Clone)]
pub struct MediaView {
    pub media: media::Model,
    pub url: String,
}

/// A report as shown in listings.
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub report: report::Model,
    pub reporter: UserView,
    pub category: category::Model,
    pub assigned_team: Option<TeamView>,
    pub media_count: usize,
    pub comment_count: u64,
    pub first_media_url: Option<String>,
}

/// A report with its media and comments.
#[derive(Debug, Clone)]
pub struct ReportDetail {
    pub report: report::Model,
    pub reporter: UserView,
    pub category: category::Model,
    pub assigned_team: Option<TeamView>,
    pub media: Vec<MediaView>,
    pub comments: Vec<CommentView>,
}

/// Text fields of a new report.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewReport {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub description: String,

    pub category_id: String,

    #[validate(length(max = 500))]
    pub location: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

/// One uploaded file, as received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Triage changes to a report.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReportInput {
    pub status: Option<String>,
    pub priority: Option<String>,
    /// Absent: unchanged. `null`: unassign. A team ID: assign.
    #[serde(default, deserialize_with = "present")]
    pub assigned_team: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Report service.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    user_repo: UserRepository,
    category_repo: CategoryRepository,
    team_repo: TeamRepository,
    media_repo: MediaRepository,
    comment_repo: CommentRepository,
    comments: CommentService,
    storage: SharedStorage,
    media: MediaService,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        report_repo: ReportRepository,
        user_repo: UserRepository,
        category_repo: CategoryRepository,
        team_repo: TeamRepository,
        media_repo: MediaRepository,
        comment_repo: CommentRepository,
        comments: CommentService,
        storage: SharedStorage,
        media: MediaService,
    ) -> Self {
        Self {
            report_repo,
            user_repo,
            category_repo,
            team_repo,
            media_repo,
            comment_repo,
            comments,
            storage,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Reports visible to `actor` under `scope`, newest first.
    pub async fn list(
        &self,
        actor: &Actor,
        scope: ListScope,
        tasks_only: bool,
    ) -> AppResult<Vec<ReportSummary>> {
        let Some(filter) = report_filter(actor, scope, tasks_only) else {
            return Ok(vec![]);
        };

        let reports = self.report_repo.list(&filter).await?;
        let ids: Vec<String> = reports.iter().map(|r| r.id.clone()).collect();

        let mut media: HashMap<String, Vec<media::Model>> = HashMap::new();
        for item in self.media_repo.find_by_reports(&ids).await? {
            media.entry(item.report_id.clone()).or_default().push(item);
        }
        let comment_counts = self.comment_repo.count_by_reports(&ids).await?;
        let related = self.related(&reports).await?;

        let mut summaries = Vec::with_capacity(reports.len());
        for report in reports {
            let items = media.remove(&report.id).unwrap_or_default();
            let (reporter, category, assigned_team) = related.resolve(&report)?;
            summaries.push(ReportSummary {
                media_count: items.len(),
                comment_count: comment_counts.get(&report.id).copied().unwrap_or(0),
                first_media_url: items.first().map(|m| self.storage.public_url(&m.file_path)),
                reporter,
                category,
                assigned_team,
                report,
            });
        }
        Ok(summaries)
    }

    /// A single report with media and comments.
    pub async fn get(&self, id: &str) -> AppResult<ReportDetail> {
        let report = self.report_repo.get_by_id(id).await?;
        self.detail(report).await
    }

    /// File a new report with its uploads.
    pub async fn create(
        &self,
        actor: &Actor,
        input: NewReport,
        files: Vec<UploadedFile>,
    ) -> AppResult<ReportDetail> {
        input.validate()?;

        let category_ok = self
            .category_repo
            .find_by_id(&input.category_id)
            .await?
            .is_some_and(|c| c.lifecycle.is_active());
        if !category_ok {
            return Err(AppError::field(
                "category",
                format!(
                    "Invalid pk \"{}\" - object does not exist.",
                    input.category_id
                ),
            ));
        }

        for file in &files {
            self.media.validate_extension(&file.file_name)?;
        }

        let mut stored_keys = Vec::with_capacity(files.len());
        let result = self.persist(actor, input, files, &mut stored_keys).await;

        match result {
            Ok((report, media)) => {
                tracing::info!(
                    report_id = %report.id,
                    reporter_id = %report.reporter_id,
                    media = media.len(),
                    "Report created"
                );
                self.assemble(report, media, vec![]).await
            }
            Err(e) => {
                for key in &stored_keys {
                    if let Err(cleanup) = self.storage.delete(key).await {
                        tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
                    }
                }
                Err(creation_error(e))
            }
        }
    }

    async fn persist(
        &self,
        actor: &Actor,
        input: NewReport,
        files: Vec<UploadedFile>,
        stored_keys: &mut Vec<String>,
    ) -> AppResult<(report::Model, Vec<media::Model>)> {
        let report_id = self.id_gen.generate();
        let now = Utc::now();
        let prefix = format!("reports/{}/{}", now.format("%Y/%m/%d"), report_id);

        let mut used_names = HashSet::new();
        let mut media_rows = Vec::with_capacity(files.len());

        for file in files {
            let processed = self.media.normalize_blocking(file.file_name, file.data).await?;
            let file_name = unique_name(&mut used_names, &sanitize_file_name(&processed.file_name));
            let key = format!("{prefix}/{file_name}");

            let stored = self
                .storage
                .put(&key, &processed.data, &processed.content_type)
                .await?;
            stored_keys.push(stored.key.clone());

            media_rows.push(media::ActiveModel {
                id: Set(self.id_gen.generate()),
                report_id: Set(report_id.clone()),
                file_name: Set(file_name),
                file_path: Set(stored.key),
                file_size: Set(stored.size as i64),
                content_type: Set(processed.content_type),
                media_type: Set(MediaType::Image),
                uploaded_at: Set(now.into()),
            });
        }

        let report = report::ActiveModel {
            id: Set(report_id),
            title: Set(input.title),
            description: Set(input.description),
            status: Set(ReportStatus::Pending),
            priority: Set(Priority::Medium),
            reporter_id: Set(actor.user_id.clone()),
            category_id: Set(input.category_id),
            assigned_team_id: Set(None),
            location: Set(input.location.filter(|l| !l.trim().is_empty())),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        self.report_repo.create_with_media(report, media_rows).await
    }

    /// Change status, priority or team assignment.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        input: UpdateReportInput,
    ) -> AppResult<ReportDetail> {
        let report = self.report_repo.get_by_id(id).await?;
        can(actor, Action::Update, Resource::Report(&report)).into_result()?;

        let status = input
            .status
            .as_deref()
            .map(|s| {
                ReportStatus::parse(s).ok_or_else(|| {
                    AppError::field("status", format!("\"{s}\" is not a valid choice."))
                })
            })
            .transpose()?;
        let priority = input
            .priority
            .as_deref()
            .map(|p| {
                Priority::parse(p).ok_or_else(|| {
                    AppError::field("priority", format!("\"{p}\" is not a valid choice."))
                })
            })
            .transpose()?;

        let assigned_team = match input.assigned_team {
            Some(Some(team_id)) => {
                let team = self
                    .team_repo
                    .find_by_id(&team_id)
                    .await?
                    .filter(|t| t.lifecycle.is_active())
                    .ok_or_else(|| AppError::NotFound(format!("Team: {team_id}")))?;
                Some(Some(team.id))
            }
            Some(None) => Some(None),
            None => None,
        };

        let mut active: report::ActiveModel = report.into();
        if let Some(status) = status {
            active.status = Set(status);
        }
        if let Some(priority) = priority {
            active.priority = Set(priority);
        }
        if let Some(team_id) = assigned_team {
            active.assigned_team_id = Set(team_id);
        }
        active.updated_at = Set(Utc::now().into());

        let report = self.report_repo.update(active).await?;
        tracing::info!(
            report_id = %report.id,
            status = ?report.status,
            assigned_team = ?report.assigned_team_id,
            "Report updated"
        );

        self.detail(report).await
    }

    /// Delete a report. Stored files are removed afterwards, best-effort.
    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        let report = self.report_repo.get_by_id(id).await?;
        can(actor, Action::Delete, Resource::Report(&report)).into_result()?;

        let media = self.media_repo.find_by_report(&report.id).await?;
        self.report_repo.delete(&report.id).await?;

        for item in &media {
            if let Err(e) = self.storage.delete(&item.file_path).await {
                tracing::warn!(
                    report_id = %report.id,
                    key = %item.file_path,
                    error = %e,
                    "Failed to delete report media"
                );
            }
        }

        tracing::info!(report_id = %report.id, media = media.len(), "Report deleted");
        Ok(())
    }

    async fn detail(&self, report: report::Model) -> AppResult<ReportDetail> {
        let media = self.media_repo.find_by_report(&report.id).await?;
        let comments = self.comments.for_report(&report.id).await?;
        self.assemble(report, media, comments).await
    }

    async fn assemble(
        &self,
        report: report::Model,
        media: Vec<media::Model>,
        comments: Vec<CommentView>,
    ) -> AppResult<ReportDetail> {
        let (reporter, category, assigned_team) = self
            .related(std::slice::from_ref(&report))
            .await?
            .resolve(&report)?;

        Ok(ReportDetail {
            media: media.into_iter().map(|m| self.media_view(m)).collect(),
            comments,
            reporter,
            category,
            assigned_team,
            report,
        })
    }

    /// Load reporters, categories and assigned teams for a batch of reports.
    async fn related(&self, reports: &[report::Model]) -> AppResult<Related> {
        let reporter_ids = distinct(reports.iter().map(|r| r.reporter_id.clone()));
        let reporters = self.user_repo.find_by_ids(&reporter_ids).await?;
        let reporters = user_views(&self.team_repo, reporters)
            .await?
            .into_iter()
            .map(|v| (v.user.id.clone(), v))
            .collect();

        let category_ids = distinct(reports.iter().map(|r| r.category_id.clone()));
        let categories = self
            .category_repo
            .find_by_ids(&category_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let team_ids = distinct(reports.iter().filter_map(|r| r.assigned_team_id.clone()));
        let teams = self.team_repo.find_by_ids(&team_ids).await?;
        let teams = team_views(&self.team_repo, &self.user_repo, teams)
            .await?
            .into_iter()
            .map(|v| (v.team.id.clone(), v))
            .collect();

        Ok(Related {
            reporters,
            categories,
            teams,
        })
    }

    fn media_view(&self, media: media::Model) -> MediaView {
        MediaView {
            url: self.storage.public_url(&media.file_path),
            media,
        }
    }
}

/// Rows referenced by a batch of reports, keyed by ID.
struct Related {
    reporters: HashMap<String, UserView>,
    categories: HashMap<String, category::Model>,
    teams: HashMap<String, TeamView>,
}

impl Related {
    fn resolve(
        &self,
        report: &report::Model,
    ) -> AppResult<(UserView, category::Model, Option<TeamView>)> {
        let reporter = self.reporters.get(&report.reporter_id).cloned().ok_or_else(|| {
            AppError::Internal(format!(
                "Reporter {} of report {} is missing",
                report.reporter_id, report.id
            ))
        })?;
        let category = self.categories.get(&report.category_id).cloned().ok_or_else(|| {
            AppError::Internal(format!(
                "Category {} of report {} is missing",
                report.category_id, report.id
            ))
        })?;
        let assigned_team = report
            .assigned_team_id
            .as_ref()
            .and_then(|id| self.teams.get(id).cloned());

        Ok((reporter, category, assigned_team))
    }
}

fn distinct(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Unexpected failures during creation are reported as client errors.
fn creation_error(err: AppError) -> AppError {
    match err {
        AppError::Database(msg) | AppError::Storage(msg) | AppError::Internal(msg) => {
            tracing::error!(error = %msg, "Report creation failed");
            AppError::BadRequest(format!("Report creation failed: {msg}"))
        }
        other => other,
    }
}

/// `name`, or `stem_n.ext` when an earlier upload already took it.
fn unique_name(used: &mut HashSet<String>, name: &str) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut n = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
