//! Soft-delete state shared by categories and teams.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a row is in use or has been retired (soft-deleted).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[sea_orm(string_value = "active")]
    #[default]
    Active,
    #[sea_orm(string_value = "retired")]
    Retired,
}

impl Lifecycle {
    /// `true` for [`Lifecycle::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Map the public `is_active` flag back to a lifecycle state.
    #[must_use]
    pub const fn from_active(active: bool) -> Self {
        if active { Self::Active } else { Self::Retired }
    }
}
