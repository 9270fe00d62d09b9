use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use rollcall_core::{StoreError, StudentId};

use super::{NewStudent, Student, StudentStore};
use crate::table::InMemoryTable;

#[derive(Debug, Default)]
pub struct InMemoryStudentStore {
    rows: InMemoryTable<Student>,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn unique_columns(existing: &Student, new: &Student) -> Option<&'static str> {
    if existing.email == new.email {
        Some("students_email_key")
    } else if existing.roll_number == new.roll_number {
        Some("students_roll_number_key")
    } else {
        None
    }
}

#[async_trait]
impl StudentStore for InMemoryStudentStore {
    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let mut rows = self.rows.list()?;
        // UUIDv7 ids are time-ordered, so they break created_at ties.
        rows.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        Ok(rows)
    }

    async fn get(&self, id: &StudentId) -> Result<Student, StoreError> {
        self.rows.get(id)?.ok_or(StoreError::NotFound)
    }

    async fn insert(&self, student: NewStudent) -> Result<Student, StoreError> {
        let row = Student {
            id: StudentId::new(Uuid::now_v7().to_string()),
            full_name: student.full_name,
            email: student.email,
            roll_number: student.roll_number,
            grade: student.grade,
            created_at: Utc::now(),
        };
        self.rows.insert(row, unique_columns)
    }

    async fn update_grade(&self, id: &StudentId, grade: String) -> Result<Student, StoreError> {
        self.rows.update(id, |row| row.grade = grade)
    }

    async fn delete(&self, id: &StudentId) -> Result<Student, StoreError> {
        self.rows.remove(id)
    }
}
