//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod auth;
pub mod category;
pub mod comment;
pub mod media;
pub mod report;
pub mod team;
pub mod user;

pub use account::{AccountService, ChangePasswordInput, RegisterInput, UpdateProfileInput};
pub use auth::{AuthService, Claims, TokenPair, TokenType, hash_password, verify_password};
pub use category::{CategoryService, CreateCategoryInput, UpdateCategoryInput};
pub use comment::{CommentInput, CommentService, CommentView};
pub use media::{MediaConfig, MediaService};
pub use report::{
    MediaView, NewReport, ReportDetail, ReportService, ReportSummary, UpdateReportInput,
    UploadedFile,
};
pub use team::{CreateTeamInput, TeamService, TeamView, UpdateTeamInput};
pub use user::{CreateUserInput, UpdateUserInput, UserService, UserView};
