use serde::{Deserialize, Serialize};

use rollcall_core::{Profile, Role, UserId};

use crate::IdentityUser;

/// The authenticated identity resolved for one request.
///
/// Built from a validated token plus the caller's profile; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

impl Principal {
    /// Combine the identity record with its profile.
    ///
    /// Email comes from the identity service (the system of record for
    /// credentials); role and name come from the profile.
    pub fn resolve(user: &IdentityUser, profile: &Profile) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: profile.role,
            full_name: profile.full_name.clone(),
        }
    }

    pub fn owns(&self, resource_id: &str) -> bool {
        self.id == *resource_id
    }
}
