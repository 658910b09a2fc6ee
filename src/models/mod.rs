mod permission;
mod role;
mod token;
mod user;

pub use permission::Permission;
pub use role::{Role, RoleSummary, SUPER_ADMIN, OWNER, USER, RESERVED_ROLES};
pub use token::{AccessToken, PasswordResetToken};
pub use user::User;
