//! `rollcall-client`
//!
//! **Responsibility:** the client-side session store.
//!
//! Holds a local view of `{user, session, role, profile, loading}` and keeps
//! it in step with the identity service's session lifecycle. The identity
//! service stays the authority; this crate only mirrors it.

pub mod config;
pub mod error;
pub mod state;
pub mod store;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use state::AuthState;
pub use store::SessionStore;
