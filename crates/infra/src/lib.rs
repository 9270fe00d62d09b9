//! Infrastructure layer: implementations of the external collaborators.
//!
//! - `identity`: in-memory identity service (dev/test) and a GoTrue-compatible
//!   HTTP client
//! - `profiles`, `reset_log`, `students`: data-store adapters, each with an
//!   in-memory and a Postgres implementation

pub mod identity;
pub mod postgres;
pub mod profiles;
pub mod reset_log;
pub mod students;
pub mod table;

pub use identity::{
    EmailKind, GoTrueClient, GoTrueConfig, InMemoryIdentityService, Operation, SentEmail,
};
pub use profiles::{InMemoryProfileStore, PostgresProfileStore};
pub use reset_log::{InMemoryResetLog, PostgresResetLog, ResetLog};
pub use students::{
    InMemoryStudentStore, NewStudent, PostgresStudentStore, Student, StudentStore,
};
pub use table::InMemoryTable;
