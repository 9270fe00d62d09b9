use async_trait::async_trait;
use sqlx::{PgPool, Row};

use rollcall_auth::ProfileStore;
use rollcall_core::{Profile, Role, StoreError, UserId};

use crate::postgres::{map_lookup_error, map_sqlx_error};

/// Postgres-backed profile table.
///
/// Privilege is a property of the pool: build the elevated handle from a
/// pool connected with the service credential and the restricted handle from
/// the application credential (subject to row-level security).
#[derive(Debug, Clone)]
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_BY_ID: &str = r#"
    SELECT id::text AS id, role, full_name, email
    FROM profiles
    WHERE id = $1::uuid
"#;

fn profile_from_row(row: &sqlx::postgres::PgRow) -> Result<Profile, StoreError> {
    let role: String = row.try_get("role").map_err(map_sqlx_error)?;
    let role: Role = role
        .parse()
        .map_err(|e: rollcall_core::ParseRoleError| StoreError::backend(e.to_string()))?;

    Ok(Profile {
        id: UserId::new(row.try_get::<String, _>("id").map_err(map_sqlx_error)?),
        role,
        full_name: row
            .try_get::<Option<String>, _>("full_name")
            .map_err(map_sqlx_error)?
            .unwrap_or_default(),
        email: row
            .try_get::<Option<String>, _>("email")
            .map_err(map_sqlx_error)?
            .unwrap_or_default(),
    })
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        let row = match sqlx::query(SELECT_BY_ID)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_lookup_error)
        {
            Ok(row) => row,
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e),
        };

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, role, full_name, email)
            VALUES ($1::uuid, $2, $3, $4)
            "#,
        )
        .bind(profile.id.as_str())
        .bind(profile.role.as_str())
        .bind(&profile.full_name)
        .bind(&profile.email)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(profile)
    }

    async fn find_profile_id_by_email(&self, email: &str) -> Result<Option<UserId>, StoreError> {
        let row = sqlx::query("SELECT id::text AS id FROM profiles WHERE email = $1 LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.try_get::<String, _>("id").map(UserId::new).map_err(map_sqlx_error))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lookup_compares_the_key_column_directly() {
        assert!(SELECT_BY_ID.contains("WHERE id = $1::uuid"));
        assert!(!SELECT_BY_ID.contains("id::text ="));
    }
}
