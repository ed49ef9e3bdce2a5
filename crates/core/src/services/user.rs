//! User administration service.

use std::collections::HashMap;

use chrono::Utc;
use cozum_common::{AppError, AppResult, IdGenerator};
use cozum_db::{
    entities::{user, user::Role},
    repositories::{TeamRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::auth::hash_password;
use crate::policy::{Action, Actor, Resource, can};

/// A user together with the name of their team.
#[derive(Debug, Clone)]
pub struct UserView {
    pub user: user::Model,
    pub team_name: Option<String>,
}

/// Resolve team names for a batch of users.
pub(crate) async fn user_views(
    team_repo: &TeamRepository,
    users: Vec<user::Model>,
) -> AppResult<Vec<UserView>> {
    let mut team_ids: Vec<String> = users.iter().filter_map(|u| u.team_id.clone()).collect();
    team_ids.sort();
    team_ids.dedup();

    let names: HashMap<String, String> = team_repo
        .find_by_ids(&team_ids)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    Ok(users
        .into_iter()
        .map(|user| {
            let team_name = user.team_id.as_ref().and_then(|id| names.get(id).cloned());
            UserView { user, team_name }
        })
        .collect())
}

/// Resolve the team name for one user.
pub(crate) async fn user_view(team_repo: &TeamRepository, user: user::Model) -> AppResult<UserView> {
    let team_name = match &user.team_id {
        Some(id) => team_repo.find_by_id(id).await?.map(|t| t.name),
        None => None,
    };
    Ok(UserView { user, team_name })
}

/// Input for creating a user from the administration screens.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters."))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    /// Wire value such as `"OPERATOR"`; defaults to citizen.
    pub role: Option<String>,

    #[serde(default)]
    pub is_staff: bool,

    #[serde(default)]
    #[validate(length(max = 20))]
    pub phone: String,

    #[serde(default)]
    pub address: String,
}

/// Input for updating a user from the administration screens.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub is_staff: Option<bool>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    pub address: Option<String>,
}

/// User administration service. Every operation is staff-only.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    team_repo: TeamRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, team_repo: TeamRepository) -> Self {
        Self {
            user_repo,
            team_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// All users, most recently joined first.
    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<UserView>> {
        can(actor, Action::View, Resource::Users).into_result()?;
        let users = self.user_repo.list().await?;
        user_views(&self.team_repo, users).await
    }

    /// A single user.
    pub async fn get(&self, actor: &Actor, id: &str) -> AppResult<UserView> {
        can(actor, Action::View, Resource::Users).into_result()?;
        let user = self.user_repo.get_by_id(id).await?;
        user_view(&self.team_repo, user).await
    }

    /// Create a user with any role.
    pub async fn create(&self, actor: &Actor, input: CreateUserInput) -> AppResult<UserView> {
        can(actor, Action::Create, Resource::Users).into_result()?;
        input.validate()?;

        let role = match input.role.as_deref() {
            Some(value) => parse_role(value)?,
            None => Role::Citizen,
        };

        let email = input.email.trim().to_lowercase();
        ensure_unique(&self.user_repo, Some(&email), Some(&input.username), None).await?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            username: Set(input.username),
            password_hash: Set(hash_password(&input.password)?),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            role: Set(role),
            is_staff: Set(input.is_staff),
            team_id: Set(None),
            phone: Set(input.phone),
            address: Set(input.address),
            date_joined: Set(Utc::now().into()),
            last_login: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, role = ?user.role, "User created by staff");
        Ok(UserView {
            user,
            team_name: None,
        })
    }

    /// Update profile fields and the staff flag.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        input: UpdateUserInput,
    ) -> AppResult<UserView> {
        can(actor, Action::Update, Resource::Users).into_result()?;
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;
        let email = input.email.map(|e| e.trim().to_lowercase());
        ensure_unique(
            &self.user_repo,
            email.as_deref(),
            input.username.as_deref(),
            Some(&user.id),
        )
        .await?;

        let mut active: user::ActiveModel = user.into();
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(username) = input.username {
            active.username = Set(username);
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(is_staff) = input.is_staff {
            active.is_staff = Set(is_staff);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }

        let user = self.user_repo.update(active).await?;
        user_view(&self.team_repo, user).await
    }

    /// Change a user's role.
    pub async fn set_role(&self, actor: &Actor, id: &str, role: &str) -> AppResult<UserView> {
        can(actor, Action::Update, Resource::Users).into_result()?;
        let role = parse_role(role)?;

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();
        active.role = Set(role);

        let user = self.user_repo.update(active).await?;
        tracing::info!(user_id = %user.id, role = ?role, "User role changed");
        user_view(&self.team_repo, user).await
    }

    /// Put a user on a team, or take them off with `None`.
    pub async fn set_team(
        &self,
        actor: &Actor,
        id: &str,
        team_id: Option<&str>,
    ) -> AppResult<UserView> {
        can(actor, Action::Update, Resource::Users).into_result()?;

        let user = self.user_repo.get_by_id(id).await?;
        let team = match team_id {
            Some(team_id) => Some(self.team_repo.get_by_id(team_id).await?),
            None => None,
        };

        let mut active: user::ActiveModel = user.into();
        active.team_id = Set(team.as_ref().map(|t| t.id.clone()));

        let user = self.user_repo.update(active).await?;
        Ok(UserView {
            user,
            team_name: team.map(|t| t.name),
        })
    }
}

fn parse_role(value: &str) -> AppResult<Role> {
    Role::parse(value).ok_or_else(|| AppError::field("role", format!("Invalid role: {value}")))
}

/// Fail with 409 when another account already uses `email` or `username`.
pub(crate) async fn ensure_unique(
    user_repo: &UserRepository,
    email: Option<&str>,
    username: Option<&str>,
    except_id: Option<&str>,
) -> AppResult<()> {
    let is_other = |found: &user::Model| Some(found.id.as_str()) != except_id;

    if let Some(email) = email {
        if let Some(found) = user_repo.find_by_email(email).await? {
            if is_other(&found) {
                return Err(AppError::Conflict(
                    "A user with this email already exists.".to_string(),
                ));
            }
        }
    }

    if let Some(username) = username {
        if let Some(found) = user_repo.find_by_username(username).await? {
            if is_other(&found) {
                return Err(AppError::Conflict(
                    "A user with this username already exists.".to_string(),
                ));
            }
        }
    }

    Ok(())
}
