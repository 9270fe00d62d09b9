//! Process-wide tracing setup shared by the rollcall binaries.

mod subscriber;

pub use subscriber::{DEFAULT_DIRECTIVE, init, init_with_default};
