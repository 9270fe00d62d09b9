use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use rollcall_auth::ProfileStore;
use rollcall_core::{Profile, StoreError, UserId};

use crate::table::InMemoryTable;

/// In-memory profile table for tests/dev.
///
/// Has no row-level policy, so the same instance can back both the elevated
/// and the restricted handle.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: InMemoryTable<Profile>,
    unavailable: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::backend("profile store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        self.ensure_available()?;
        self.rows.get(id)
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, StoreError> {
        self.ensure_available()?;
        self.rows.insert(profile, |_, _| None)
    }

    async fn find_profile_id_by_email(&self, email: &str) -> Result<Option<UserId>, StoreError> {
        self.ensure_available()?;
        Ok(self.rows.find(|p| p.email == email)?.map(|p| p.id))
    }
}
