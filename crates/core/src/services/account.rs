//! Account service: registration, login and self-service profile changes.

use chrono::Utc;
use cozum_common::config::BootstrapAdminConfig;
use cozum_common::{AppError, AppResult, IdGenerator};
use cozum_db::{
    entities::{user, user::Role},
    repositories::{TeamRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::auth::{AuthService, TokenPair, TokenType, hash_password, verify_password};
use super::user::{UserView, ensure_unique, user_view};

/// Input for self-registration.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_registration_passwords"))]
pub struct RegisterInput {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters."))]
    pub password: String,

    pub password_confirm: String,

    #[serde(default)]
    #[validate(length(max = 20))]
    pub phone: String,

    #[serde(default)]
    pub address: String,
}

fn validate_registration_passwords(input: &RegisterInput) -> Result<(), ValidationError> {
    if input.password == input.password_confirm {
        Ok(())
    } else {
        Err(passwords_differ())
    }
}

/// Input for changing one's own profile.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    pub address: Option<String>,
}

/// Input for changing one's own password.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_new_passwords"))]
pub struct ChangePasswordInput {
    pub old_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters."))]
    pub new_password: String,

    pub new_password_confirm: String,
}

fn validate_new_passwords(input: &ChangePasswordInput) -> Result<(), ValidationError> {
    if input.new_password == input.new_password_confirm {
        Ok(())
    } else {
        Err(passwords_differ())
    }
}

fn passwords_differ() -> ValidationError {
    let mut err = ValidationError::new("password_mismatch");
    err.message = Some("Password fields didn't match.".into());
    err
}

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    team_repo: TeamRepository,
    auth: AuthService,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, team_repo: TeamRepository, auth: AuthService) -> Self {
        Self {
            user_repo,
            team_repo,
            auth,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new citizen account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<UserView> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        ensure_unique(&self.user_repo, Some(&email), Some(&input.username), None).await?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            username: Set(input.username),
            password_hash: Set(hash_password(&input.password)?),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            role: Set(Role::Citizen),
            is_staff: Set(false),
            team_id: Set(None),
            phone: Set(input.phone),
            address: Set(input.address),
            date_joined: Set(Utc::now().into()),
            last_login: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok(UserView {
            user,
            team_name: None,
        })
    }

    /// Check credentials and issue a token pair.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let user = self.user_repo.record_login(user).await?;
        self.auth.issue_pair(&user)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = self.auth.verify(refresh_token, TokenType::Refresh)?;
        let user = self
            .user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::InvalidToken("user no longer exists".to_string()))?;

        self.auth.issue(&user, TokenType::Access)
    }

    /// Resolve the user behind an access token.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<user::Model> {
        let claims = self.auth.verify(access_token, TokenType::Access)?;
        self.user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::InvalidToken("user no longer exists".to_string()))
    }

    /// The caller's own profile.
    pub async fn me(&self, user: user::Model) -> AppResult<UserView> {
        user_view(&self.team_repo, user).await
    }

    /// Update the caller's own profile.
    pub async fn update_me(
        &self,
        user: user::Model,
        input: UpdateProfileInput,
    ) -> AppResult<UserView> {
        input.validate()?;
        ensure_unique(
            &self.user_repo,
            None,
            input.username.as_deref(),
            Some(&user.id),
        )
        .await?;

        let mut active: user::ActiveModel = user.into();
        if let Some(username) = input.username {
            active.username = Set(username);
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
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

    /// Change the caller's own password.
    pub async fn change_password(
        &self,
        user: user::Model,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        input.validate()?;

        if !verify_password(&input.old_password, &user.password_hash)? {
            return Err(AppError::field("old_password", "Old password is not correct."));
        }

        let user_id = user.id.clone();
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        self.user_repo.update(active).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Make sure the configured administrator account exists.
    ///
    /// An existing account with the same email is promoted rather than
    /// recreated; its password is left alone.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdminConfig) -> AppResult<user::Model> {
        let email = admin.email.trim().to_lowercase();

        if let Some(existing) = self.user_repo.find_by_email(&email).await? {
            if existing.is_staff && existing.role == Role::Admin {
                return Ok(existing);
            }
            let mut active: user::ActiveModel = existing.into();
            active.role = Set(Role::Admin);
            active.is_staff = Set(true);
            let user = self.user_repo.update(active).await?;
            tracing::info!(user_id = %user.id, "Promoted existing user to bootstrap admin");
            return Ok(user);
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            username: Set(admin.username.clone()),
            password_hash: Set(hash_password(&admin.password)?),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            role: Set(Role::Admin),
            is_staff: Set(true),
            team_id: Set(None),
            phone: Set(String::new()),
            address: Set(String::new()),
            date_joined: Set(Utc::now().into()),
            last_login: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, "Created bootstrap admin");
        Ok(user)
    }
}
