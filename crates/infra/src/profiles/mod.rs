//! Profile store adapters.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryProfileStore;
pub use postgres::PostgresProfileStore;
