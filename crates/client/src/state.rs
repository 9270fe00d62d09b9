//! Client auth state snapshot.

use rollcall_auth::{IdentityUser, Session};
use rollcall_core::{Profile, Role};

/// The store's view of the current session.
///
/// Replaced as a whole on every change; `version` counts replacements so
/// observers can tell two equal-looking snapshots apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<IdentityUser>,
    pub session: Option<Session>,
    pub role: Option<Role>,
    pub profile: Option<Profile>,
    /// True until session state is resolved for the first time.
    pub loading: bool,
    pub version: u64,
}

impl AuthState {
    /// State before `initialize` has completed.
    pub fn initial() -> Self {
        Self {
            user: None,
            session: None,
            role: None,
            profile: None,
            loading: true,
            version: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The `{user, session, role, profile}` part, ignoring bookkeeping.
    pub fn is_signed_out(&self) -> bool {
        self.user.is_none() && self.session.is_none() && self.role.is_none() && self.profile.is_none()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initial()
    }
}

/// A resolved session view, before bookkeeping fields are stamped on.
#[derive(Debug, Clone, Default)]
pub(crate) struct Resolved {
    pub user: Option<IdentityUser>,
    pub session: Option<Session>,
    pub role: Option<Role>,
    pub profile: Option<Profile>,
}

impl Resolved {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Role precedence: profile row, then sign-up metadata, then student.
    pub fn signed_in(session: Session, profile: Option<Profile>) -> Self {
        let role = profile
            .as_ref()
            .map(|p| p.role)
            .or_else(|| session.user.metadata.role())
            .unwrap_or_default();
        Self {
            user: Some(session.user.clone()),
            session: Some(session),
            role: Some(role),
            profile,
        }
    }

    pub fn into_state(self, version: u64) -> AuthState {
        AuthState {
            user: self.user,
            session: self.session,
            role: self.role,
            profile: self.profile,
            loading: false,
            version,
        }
    }
}
