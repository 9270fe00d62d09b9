//! Shared Postgres plumbing.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use rollcall_core::StoreError;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for `invalid_text_representation` (e.g. a malformed uuid).
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    tracing::info!(max_connections, "connecting to postgres");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Translate a driver error into the store error taxonomy.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string())
        }
        other => {
            tracing::warn!(error = %other, "postgres query failed");
            StoreError::backend(other.to_string())
        }
    }
}

/// Like [`map_sqlx_error`], for statements keyed by `$1::uuid`: a key that
/// does not parse cannot match a row.
pub(crate) fn map_lookup_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(INVALID_TEXT_REPRESENTATION) => {
            StoreError::NotFound
        }
        other => map_sqlx_error(other),
    }
}
