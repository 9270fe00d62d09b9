//! Authentication and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the identity
//! service and the profile store are reached through traits, and the guards
//! are pure functions over an already-resolved [`Principal`].

pub mod authenticate;
pub mod authorize;
pub mod identity;
pub mod principal;
pub mod profiles;

pub use authenticate::{Authenticator, extract_bearer};
pub use authorize::{
    Guard, authorize_roles, check_ownership, require_principal, require_student, require_teacher,
};
pub use identity::{
    IdentityError, IdentityService, IdentityUser, Session, SessionEvent, SessionEventKind, SignUp,
    UserMetadata,
};
pub use principal::Principal;
pub use profiles::{ElevatedProfiles, ProfileStore};
