//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user within the municipality workflow.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "CITIZEN")]
    #[default]
    Citizen,
    #[sea_orm(string_value = "FIELD_TEAM")]
    FieldTeam,
    #[sea_orm(string_value = "OPERATOR")]
    Operator,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

impl Role {
    /// Human-readable label.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Citizen => "Citizen",
            Self::FieldTeam => "Field Team",
            Self::Operator => "Operator",
            Self::Admin => "Admin",
        }
    }

    /// Parse a wire value such as `"FIELD_TEAM"` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::try_from_value(&value.trim().to_uppercase()).ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Login identity, stored lower-cased
    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub role: Role,

    /// May administer categories, teams and users
    #[sea_orm(default_value = false)]
    pub is_staff: bool,

    #[sea_orm(nullable)]
    pub team_id: Option<String>,

    pub phone: String,

    #[sea_orm(column_type = "Text")]
    pub address: String,

    pub date_joined: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub last_login: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// `first_name last_name`, falling back to the username.
    #[must_use]
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id",
        on_delete = "SetNull"
    )]
    Team,
    #[sea_orm(has_many = "super::report::Entity")]
    Report,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Report.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("FIELD_TEAM"), Some(Role::FieldTeam));
        assert_eq!(Role::parse("operator"), Some(Role::Operator));
        assert_eq!(Role::parse("MAYOR"), None);
    }

    #[test]
    fn test_role_serializes_as_wire_value() {
        assert_eq!(
            serde_json::to_string(&Role::FieldTeam).unwrap_or_default(),
            "\"FIELD_TEAM\""
        );
        assert_eq!(Role::FieldTeam.display_name(), "Field Team");
    }
}
