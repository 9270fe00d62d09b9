use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use rollcall_core::{PasswordResetLogEntry, StoreError};

use super::ResetLog;

#[derive(Debug, Default)]
pub struct InMemoryResetLog {
    entries: Mutex<Vec<PasswordResetLogEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryResetLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<PasswordResetLogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResetLog for InMemoryResetLog {
    async fn append(&self, entry: PasswordResetLogEntry) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::backend("reset log unavailable"));
        }
        self.entries
            .lock()
            .map_err(|_| StoreError::backend("reset log lock poisoned"))?
            .push(entry);
        Ok(())
    }
}
