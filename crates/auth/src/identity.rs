//! Contract of the external identity service.
//!
//! The identity service owns credentials, tokens and sessions. Implementations
//! live in `rollcall-infra`; everything here is transport-agnostic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use rollcall_core::{Role, UserId};

/// Metadata captured at sign-up and carried in the identity record.
///
/// The profile row is created from it lazily, on first session
/// initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserMetadata {
    pub fn new(full_name: impl Into<String>, role: Role) -> Self {
        Self {
            full_name: Some(full_name.into()),
            role: Some(role.as_str().to_string()),
        }
    }

    /// Role carried in the metadata, if it names a known role.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

/// Account record as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: UserId,
    pub email: String,
    #[serde(rename = "user_metadata", default)]
    pub metadata: UserMetadata,
}

/// Token bundle issued by the identity service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: IdentityUser,
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Sign-up request.
#[derive(Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub metadata: UserMetadata,
    /// Where the confirmation email should send the user back to.
    pub redirect_to: String,
}

impl core::fmt::Debug for SignUp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SignUp")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("metadata", &self.metadata)
            .field("redirect_to", &self.redirect_to)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// Session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    /// Present for `SignedIn` / `TokenRefreshed`.
    pub session: Option<Session>,
}

impl SessionEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: SessionEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            kind: SessionEventKind::TokenRefreshed,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: SessionEventKind::SignedOut,
            session: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("no active session")]
    NoSession,

    /// The service answered with an error not covered above.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("identity service unreachable: {0}")]
    Transport(String),
}

/// Operations required from the identity service.
///
/// Session-scoped operations (`get_session`, `sign_out`, `update_password`)
/// act on the session held by this client instance. Server processes use
/// stateless instances and only call `validate_token`, `revoke_token` and the
/// credential-less operations.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve the user an access token belongs to.
    async fn validate_token(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;

    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn sign_up(&self, request: SignUp) -> Result<IdentityUser, IdentityError>;

    /// End the current session of this client.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Revoke the session behind an access token (server-side logout).
    async fn revoke_token(&self, access_token: &str) -> Result<(), IdentityError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError>;

    /// Change the password of the current session's user.
    async fn update_password(&self, new_password: &str) -> Result<IdentityUser, IdentityError>;

    async fn resend_verification(&self, email: &str) -> Result<(), IdentityError>;

    /// Subscribe to session lifecycle events of this client.
    fn session_events(&self) -> broadcast::Receiver<SessionEvent>;
}
