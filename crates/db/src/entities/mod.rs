//! Database entities.

#![allow(missing_docs)]

pub mod category;
pub mod comment;
pub mod lifecycle;
pub mod media;
pub mod report;
pub mod team;
pub mod team_member;
pub mod user;

pub use category::Entity as Category;
pub use comment::Entity as Comment;
pub use lifecycle::Lifecycle;
pub use media::Entity as Media;
pub use report::Entity as Report;
pub use team::Entity as Team;
pub use team_member::Entity as TeamMember;
pub use user::Entity as User;
