//! Password-reset audit log.

mod in_memory;
mod postgres;

use async_trait::async_trait;

use rollcall_core::{PasswordResetLogEntry, StoreError};

pub use in_memory::InMemoryResetLog;
pub use postgres::PostgresResetLog;

/// Append-only sink for password-reset attempts.
#[async_trait]
pub trait ResetLog: Send + Sync {
    async fn append(&self, entry: PasswordResetLogEntry) -> Result<(), StoreError>;
}
