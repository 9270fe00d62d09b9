use serde::{Deserialize, Serialize};

use crate::{Entity, Role, UserId};

/// Application-level user record supplementing the identity service's account.
///
/// Exactly one profile exists per identity user; `id` equals the identity
/// user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub role: Role,
    pub full_name: String,
    pub email: String,
}

impl Profile {
    /// Profile created on first session initialization when none exists yet.
    ///
    /// Role and name come from the metadata captured at sign-up; a missing
    /// role defaults to student and a missing name to the empty string.
    pub fn default_for(
        id: UserId,
        email: impl Into<String>,
        full_name: Option<&str>,
        role: Option<Role>,
    ) -> Self {
        Self {
            id,
            role: role.unwrap_or_default(),
            full_name: full_name.unwrap_or_default().to_string(),
            email: email.into(),
        }
    }
}

impl Entity for Profile {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
