use thiserror::Error;

use rollcall_auth::IdentityError;
use rollcall_core::StoreError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Your email is not verified. Please check your inbox.")]
    EmailNotVerified,

    #[error("You are already registered. Please login.")]
    AlreadyRegistered,

    /// Signed in, but no profile row exists for the user.
    #[error("User profile does not exist. Please contact admin.")]
    ProfileMissing,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("profile store error: {0}")]
    Store(#[from] StoreError),
}
