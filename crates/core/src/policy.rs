//! Authorization rules.
//!
//! Every permission check in the system goes through [`can`] (for mutations)
//! or [`report_filter`] (for report listings). Both are pure functions of the
//! caller and the target rows, so they are tested without HTTP or a database.

use cozum_common::{AppError, AppResult};
use cozum_db::entities::{comment, report, user, user::Role};
use cozum_db::repositories::ReportFilter;

/// The authenticated caller as seen by the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// User ID.
    pub user_id: String,
    /// Workflow role.
    pub role: Role,
    /// Team the user belongs to, if any.
    pub team_id: Option<String>,
    /// Staff flag, grants administration.
    pub is_staff: bool,
}

impl Actor {
    /// Build an actor from a user row.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
            team_id: user.team_id.clone(),
            is_staff: user.is_staff,
        }
    }

    /// Operators, admins and staff see and manage every report.
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        self.is_staff || matches!(self.role, Role::Operator | Role::Admin)
    }

    const fn is_plain_citizen(&self) -> bool {
        !self.is_staff && matches!(self.role, Role::Citizen)
    }

    fn same_team(&self, team_id: Option<&str>) -> bool {
        match (self.team_id.as_deref(), team_id) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }
}

/// What the caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a new row.
    Create,
    /// Change an existing row.
    Update,
    /// Remove (or retire) an existing row.
    Delete,
    /// Read administrative data.
    View,
}

/// What the action targets.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// A report.
    Report(&'a report::Model),
    /// The comment thread of a report (commenting on it).
    CommentThread(&'a report::Model),
    /// A single comment.
    Comment(&'a comment::Model),
    /// The category catalogue.
    Categories,
    /// Teams.
    Teams,
    /// User accounts.
    Users,
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action is refused, with a reason for the client.
    Deny(&'static str),
}

impl Decision {
    /// Whether the decision allows the action.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Turn a denial into [`AppError::Forbidden`].
    pub fn into_result(self) -> AppResult<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(AppError::Forbidden(reason.to_string())),
        }
    }
}

/// Decide whether `actor` may perform `action` on `resource`.
#[must_use]
pub fn can(actor: &Actor, action: Action, resource: Resource<'_>) -> Decision {
    match (action, resource) {
        (Action::Create, Resource::Report(_)) => Decision::Allow,
        (Action::Update, Resource::Report(report)) => can_update_report(actor, report),
        (Action::Delete, Resource::Report(report)) => can_delete_report(actor, report),

        (Action::Create, Resource::CommentThread(report)) => {
            if actor.is_plain_citizen() && report.reporter_id != actor.user_id {
                Decision::Deny("You can only comment on your own reports.")
            } else {
                Decision::Allow
            }
        }

        (Action::Update | Action::Delete, Resource::Comment(comment)) => {
            if comment.user_id == actor.user_id
                || actor.is_staff
                || matches!(actor.role, Role::Operator)
            {
                Decision::Allow
            } else {
                Decision::Deny("You can only modify your own comments.")
            }
        }

        (_, Resource::Categories | Resource::Teams | Resource::Users) => {
            if actor.is_staff {
                Decision::Allow
            } else {
                Decision::Deny("Only staff members can perform this action.")
            }
        }

        _ => Decision::Deny("This action is not supported."),
    }
}

fn can_update_report(actor: &Actor, report: &report::Model) -> Decision {
    if actor.is_privileged() {
        return Decision::Allow;
    }

    match actor.role {
        Role::FieldTeam => {
            if actor.same_team(report.assigned_team_id.as_deref()) {
                Decision::Allow
            } else {
                Decision::Deny("You can only update reports assigned to your team.")
            }
        }
        _ => Decision::Deny("Citizens cannot update reports."),
    }
}

fn can_delete_report(actor: &Actor, report: &report::Model) -> Decision {
    if actor.is_privileged() {
        return Decision::Allow;
    }

    match actor.role {
        Role::Citizen if report.reporter_id == actor.user_id => Decision::Allow,
        Role::Citizen => Decision::Deny("You can only delete your own reports."),
        _ => Decision::Deny("Field teams cannot delete reports."),
    }
}

/// The `scope` query parameter of report listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// No (or an unrecognised) value: the role's default view.
    Default,
    /// Every report.
    All,
    /// Reports the caller filed.
    Mine,
    /// Reports assigned to the caller's team.
    Assigned,
}

impl ListScope {
    /// Parse the raw query value. Unknown values fall back to the default.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("all") => Self::All,
            Some("mine") => Self::Mine,
            Some("assigned") => Self::Assigned,
            _ => Self::Default,
        }
    }
}

/// Rows a report listing may return.
///
/// `None` means the caller can see nothing (e.g. asked for their team's
/// reports without being on a team).
#[must_use]
pub fn report_filter(actor: &Actor, scope: ListScope, tasks_only: bool) -> Option<ReportFilter> {
    let own = || ReportFilter {
        reporter_id: Some(actor.user_id.clone()),
        ..Default::default()
    };
    let team = || {
        actor.team_id.clone().map(|team_id| ReportFilter {
            assigned_team_id: Some(team_id),
            ..Default::default()
        })
    };
    let role_default = || {
        if actor.is_privileged() {
            Some(ReportFilter::default())
        } else if matches!(actor.role, Role::FieldTeam) {
            team()
        } else {
            Some(own())
        }
    };

    let filter = match scope {
        ListScope::Mine => Some(own()),
        ListScope::Assigned => team(),
        ListScope::All if !actor.is_plain_citizen() => Some(ReportFilter::default()),
        ListScope::All | ListScope::Default => role_default(),
    }?;

    if !tasks_only {
        return Some(filter);
    }

    let team_id = actor.team_id.clone()?;
    Some(ReportFilter {
        assigned_team_id: Some(team_id),
        open_only: true,
        ..filter
    })
}
