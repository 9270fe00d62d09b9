//! Identity service implementations.

mod gotrue;
mod in_memory;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use gotrue::{GoTrueClient, GoTrueConfig};
pub use in_memory::{EmailKind, InMemoryIdentityService, Operation, SentEmail};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// The guarded values are plain session/account snapshots; a panic while
/// holding the lock cannot leave them half-written.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
