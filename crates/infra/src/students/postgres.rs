use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use rollcall_core::{StoreError, StudentId};

use super::{NewStudent, Student, StudentStore};
use crate::postgres::{map_lookup_error, map_sqlx_error};

const COLUMNS: &str = "id::text AS id, full_name, email, roll_number, grade, created_at";

fn select_by_id() -> String {
    format!("SELECT {COLUMNS} FROM students WHERE id = $1::uuid")
}

fn update_grade_by_id() -> String {
    format!("UPDATE students SET grade = $2 WHERE id = $1::uuid RETURNING {COLUMNS}")
}

fn delete_by_id() -> String {
    format!("DELETE FROM students WHERE id = $1::uuid RETURNING {COLUMNS}")
}

/// Postgres-backed `students` table.
///
/// Connect with the restricted credential: row-level policy applies.
#[derive(Debug, Clone)]
pub struct PostgresStudentStore {
    pool: PgPool,
}

impl PostgresStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn student_from_row(row: &sqlx::postgres::PgRow) -> Result<Student, StoreError> {
    Ok(Student {
        id: StudentId::new(row.try_get::<String, _>("id").map_err(map_sqlx_error)?),
        full_name: row.try_get("full_name").map_err(map_sqlx_error)?,
        email: row.try_get("email").map_err(map_sqlx_error)?,
        roll_number: row.try_get("roll_number").map_err(map_sqlx_error)?,
        grade: row.try_get("grade").map_err(map_sqlx_error)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl StudentStore for PostgresStudentStore {
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM students ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(student_from_row).collect()
    }

    async fn get(&self, id: &StudentId) -> Result<Student, StoreError> {
        let row = sqlx::query(&select_by_id())
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_lookup_error)?;

        student_from_row(&row)
    }

    async fn insert(&self, student: NewStudent) -> Result<Student, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO students (full_name, email, roll_number, grade)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(&student.roll_number)
        .bind(&student.grade)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        student_from_row(&row)
    }

    async fn update_grade(&self, id: &StudentId, grade: String) -> Result<Student, StoreError> {
        let row = sqlx::query(&update_grade_by_id())
            .bind(id.as_str())
            .bind(grade)
            .fetch_one(&self.pool)
            .await
            .map_err(map_lookup_error)?;

        student_from_row(&row)
    }

    async fn delete(&self, id: &StudentId) -> Result<Student, StoreError> {
        let row = sqlx::query(&delete_by_id())
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_lookup_error)?;

        student_from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_statements_compare_the_key_column_directly() {
        for sql in [select_by_id(), update_grade_by_id(), delete_by_id()] {
            assert!(sql.contains("WHERE id = $1::uuid"), "{sql}");
            assert!(!sql.contains("id::text ="), "{sql}");
        }
    }
}
