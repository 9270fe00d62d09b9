//! Error model.
//!
//! `AppError` is the closed set of failure kinds every access-control
//! decision maps to. Transport layers translate the kind into a status code;
//! nothing here knows about HTTP.

use thiserror::Error;

/// Result type used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Why a request could not be tied to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// No `Authorization: Bearer <token>` header, or an empty token.
    MissingToken,
    /// The identity service rejected the token (unknown, revoked, expired).
    InvalidToken,
    /// A guard ran without an authenticated principal in scope.
    NotAuthenticated,
}

impl UnauthenticatedReason {
    pub fn label(&self) -> &'static str {
        match self {
            UnauthenticatedReason::MissingToken => "No token provided",
            UnauthenticatedReason::InvalidToken => "Invalid or expired token",
            UnauthenticatedReason::NotAuthenticated => "Not authenticated",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            UnauthenticatedReason::MissingToken => "Please login to continue",
            UnauthenticatedReason::InvalidToken => "Please login again",
            UnauthenticatedReason::NotAuthenticated => "Please login first",
        }
    }
}

/// Application-level error kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Missing, invalid or expired credential.
    #[error("unauthenticated: {}", .0.label())]
    Unauthenticated(UnauthenticatedReason),

    /// Valid credential without a linked profile row (setup inconsistency).
    #[error("profile not found")]
    ProfileMissing,

    /// The profile store failed while resolving the caller.
    #[error("profile lookup failed: {0}")]
    ProfileLookupFailed(String),

    /// Valid credential, insufficient role or ownership.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// User-correctable input problem (e.g. duplicate email).
    #[error("validation failed: {0}")]
    DomainValidation(String),

    /// Identity-service or data-store failure not otherwise classified.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl AppError {
    pub fn unauthenticated(reason: UnauthenticatedReason) -> Self {
        Self::Unauthenticated(reason)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::DomainValidation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Short label returned to callers as the `error` field.
    pub fn label(&self) -> String {
        match self {
            AppError::Unauthenticated(reason) => reason.label().to_string(),
            AppError::ProfileMissing => "Profile not found".to_string(),
            AppError::ProfileLookupFailed(_) => "Profile error".to_string(),
            AppError::Forbidden(_) => "Access denied".to_string(),
            AppError::DomainValidation(msg) | AppError::Upstream(msg) => msg.clone(),
        }
    }

    /// Human-readable detail returned to callers as the `message` field.
    ///
    /// Never contains upstream diagnostics for credential or profile failures.
    pub fn public_message(&self) -> Option<String> {
        match self {
            AppError::Unauthenticated(reason) => Some(reason.message().to_string()),
            AppError::ProfileMissing => {
                Some("User profile does not exist. Please contact admin.".to_string())
            }
            AppError::ProfileLookupFailed(_) => Some("Unable to load user profile".to_string()),
            AppError::Forbidden(msg) => Some(msg.clone()),
            AppError::DomainValidation(_) | AppError::Upstream(_) => None,
        }
    }
}

/// Failure reported by a data-store backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("duplicate value violates unique constraint: {0}")]
    Duplicate(String),

    #[error("record not found")]
    NotFound,

    /// Connection, query or decoding failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate(_) => AppError::validation("Record already exists"),
            StoreError::NotFound => AppError::validation("Record not found"),
            StoreError::Backend(msg) => AppError::Upstream(msg),
        }
    }
}
