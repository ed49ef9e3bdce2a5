//! Repositories: query helpers over the entities.

mod category;
mod comment;
mod media;
mod report;
mod team;
mod user;

pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use media::MediaRepository;
pub use report::{ReportFilter, ReportRepository};
pub use team::TeamRepository;
pub use user::UserRepository;

use sea_orm::{ColumnTrait, Condition};

use crate::entities::lifecycle::Lifecycle;

/// Which rows a list query returns for soft-deletable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only rows that have not been retired.
    #[default]
    ActiveOnly,
    /// Active and retired rows alike.
    All,
}

impl Visibility {
    /// Condition restricting `column` (a lifecycle column) to visible rows.
    pub(crate) fn condition<C: ColumnTrait>(self, column: C) -> Condition {
        match self {
            Self::ActiveOnly => Condition::all().add(column.eq(Lifecycle::Active)),
            Self::All => Condition::all(),
        }
    }
}
