//! Shared domain vocabulary.
//!
//! Identifiers, roles, profiles, the password-reset audit record and the
//! closed error taxonomy used by every other crate. No IO lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod profile;
pub mod reset_log;
pub mod role;

pub use entity::Entity;
pub use error::{AppError, AppResult, StoreError, UnauthenticatedReason};
pub use id::{StudentId, UserId};
pub use profile::Profile;
pub use reset_log::{PasswordResetLogEntry, ResetStatus};
pub use role::{ParseRoleError, Role};
