//! Category service.

use chrono::Utc;
use cozum_common::{AppResult, IdGenerator};
use cozum_db::{
    entities::{category, lifecycle::Lifecycle},
    repositories::{CategoryRepository, Visibility},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::policy::{Action, Actor, Resource, can};

/// Input for creating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// Input for updating a category.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    pub description: Option<String>,

    /// `false` retires the category, `true` brings it back.
    pub is_active: Option<bool>,
}

/// Category service.
#[derive(Clone)]
pub struct CategoryService {
    category_repo: CategoryRepository,
    id_gen: IdGenerator,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub const fn new(category_repo: CategoryRepository) -> Self {
        Self {
            category_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Active categories, by name.
    pub async fn list(&self) -> AppResult<Vec<category::Model>> {
        self.category_repo.list(Visibility::ActiveOnly).await
    }

    /// A single category. Retired categories still resolve.
    pub async fn get(&self, id: &str) -> AppResult<category::Model> {
        self.category_repo.get_by_id(id).await
    }

    /// Create a category.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateCategoryInput,
    ) -> AppResult<category::Model> {
        can(actor, Action::Create, Resource::Categories).into_result()?;
        input.validate()?;

        let model = category::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            description: Set(input.description),
            lifecycle: Set(Lifecycle::Active),
            created_at: Set(Utc::now().into()),
        };

        let category = self.category_repo.create(model).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Update a category.
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        input: UpdateCategoryInput,
    ) -> AppResult<category::Model> {
        can(actor, Action::Update, Resource::Categories).into_result()?;
        input.validate()?;

        let category = self.category_repo.get_by_id(id).await?;
        let mut active: category::ActiveModel = category.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(is_active) = input.is_active {
            active.lifecycle = Set(Lifecycle::from_active(is_active));
        }

        self.category_repo.update(active).await
    }

    /// Retire a category. Reports filed under it are untouched.
    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        can(actor, Action::Delete, Resource::Categories).into_result()?;

        let category = self.category_repo.get_by_id(id).await?;
        let category = self.category_repo.retire(category).await?;
        tracing::info!(category_id = %category.id, "Category retired");
        Ok(())
    }
}
