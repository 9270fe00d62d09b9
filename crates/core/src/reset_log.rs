use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Outcome recorded for a password-reset attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetStatus {
    Requested,
    Failed,
}

impl ResetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetStatus::Requested => "requested",
            ResetStatus::Failed => "failed",
        }
    }
}

/// Append-only audit record, one per password-reset attempt.
///
/// `user_id` is set only when a profile with the requested email was found;
/// its absence never prevents the reset email from being dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetLogEntry {
    pub user_id: Option<UserId>,
    pub email: String,
    pub status: ResetStatus,
    pub requested_at: DateTime<Utc>,
}

impl PasswordResetLogEntry {
    pub fn requested(user_id: Option<UserId>, email: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            email: email.into(),
            status: ResetStatus::Requested,
            requested_at: at,
        }
    }

    pub fn failed(email: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id: None,
            email: email.into(),
            status: ResetStatus::Failed,
            requested_at: at,
        }
    }
}
