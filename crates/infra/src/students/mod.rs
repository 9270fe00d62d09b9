//! Student records: a plain pass-through resource behind the access guards.

mod in_memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{Entity, StoreError, StudentId};

pub use in_memory::InMemoryStudentStore;
pub use postgres::PostgresStudentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub full_name: String,
    pub email: String,
    pub roll_number: String,
    pub grade: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Student {
    type Id = StudentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub full_name: String,
    pub email: String,
    pub roll_number: String,
    pub grade: String,
}

/// Student table. Email and roll number are unique; violations surface as
/// [`StoreError::Duplicate`].
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// All students, newest first.
    async fn list(&self) -> Result<Vec<Student>, StoreError>;

    async fn get(&self, id: &StudentId) -> Result<Student, StoreError>;

    async fn insert(&self, student: NewStudent) -> Result<Student, StoreError>;

    async fn update_grade(&self, id: &StudentId, grade: String) -> Result<Student, StoreError>;

    /// Delete and return the removed row.
    async fn delete(&self, id: &StudentId) -> Result<Student, StoreError>;
}
