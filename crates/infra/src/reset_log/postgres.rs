use async_trait::async_trait;
use sqlx::PgPool;

use rollcall_core::{PasswordResetLogEntry, StoreError};

use super::ResetLog;
use crate::postgres::map_sqlx_error;

/// Writes to the `password_reset_logs` table.
#[derive(Debug, Clone)]
pub struct PostgresResetLog {
    pool: PgPool,
}

impl PostgresResetLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetLog for PostgresResetLog {
    async fn append(&self, entry: PasswordResetLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_logs (user_id, email, status, requested_at)
            VALUES ($1::uuid, $2, $3, $4)
            "#,
        )
        .bind(entry.user_id.as_ref().map(|id| id.as_str()))
        .bind(&entry.email)
        .bind(entry.status.as_str())
        .bind(entry.requested_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
