//! Profile store contract and its capability-scoped handles.
//!
//! The same external table is reached with two privileges:
//! - restricted: bound by the store's row-level policy, used everywhere
//!   (handlers, the client session store);
//! - elevated: bypasses row-level policy; wrapped in [`ElevatedProfiles`],
//!   which only exposes a read and is owned by the [`crate::Authenticator`].

use std::sync::Arc;

use async_trait::async_trait;

use rollcall_core::{Profile, StoreError, UserId};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError>;

    /// Insert a new profile; an existing row with the same id is a `Duplicate`.
    async fn insert_profile(&self, profile: Profile) -> Result<Profile, StoreError>;

    async fn find_profile_id_by_email(&self, email: &str) -> Result<Option<UserId>, StoreError>;
}

/// Policy-bypassing profile reader.
///
/// Deliberately not `Clone`: wiring code builds one and moves it into the
/// authenticator, so handlers never get hold of elevated privilege.
pub struct ElevatedProfiles {
    inner: Arc<dyn ProfileStore>,
}

impl ElevatedProfiles {
    /// `store` must be connected with the elevated credential.
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { inner: store }
    }

    pub async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        self.inner.get_profile(id).await
    }
}

impl core::fmt::Debug for ElevatedProfiles {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ElevatedProfiles")
    }
}
