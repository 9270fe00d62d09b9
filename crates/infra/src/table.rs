//! Generic in-memory table for dev/test stores.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rollcall_core::{Entity, StoreError};

/// Rows keyed by entity id.
///
/// Lock poisoning is reported as a backend error rather than a panic.
#[derive(Debug)]
pub struct InMemoryTable<E: Entity> {
    rows: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> InMemoryTable<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity> Default for InMemoryTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryTable<E>
where
    E: Entity + Clone,
{
    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.rows.read().map_err(|_| StoreError::backend("table lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<E::Id, E>>, StoreError> {
        self.rows.write().map_err(|_| StoreError::backend("table lock poisoned"))
    }

    pub fn get(&self, id: &E::Id) -> Result<Option<E>, StoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    pub fn find(&self, pred: impl Fn(&E) -> bool) -> Result<Option<E>, StoreError> {
        Ok(self.read()?.values().find(|row| pred(row)).cloned())
    }

    pub fn list(&self) -> Result<Vec<E>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Insert a new row.
    ///
    /// `conflict` is evaluated against every existing row under the write
    /// lock and names the violated unique constraint, if any. An existing row
    /// with the same id is always a conflict.
    pub fn insert(
        &self,
        row: E,
        conflict: impl Fn(&E, &E) -> Option<&'static str>,
    ) -> Result<E, StoreError> {
        let mut rows = self.write()?;
        if rows.contains_key(row.id()) {
            return Err(StoreError::Duplicate("primary key".to_string()));
        }
        if let Some(constraint) = rows.values().find_map(|existing| conflict(existing, &row)) {
            return Err(StoreError::Duplicate(constraint.to_string()));
        }
        rows.insert(row.id().clone(), row.clone());
        Ok(row)
    }

    pub fn update(&self, id: &E::Id, apply: impl FnOnce(&mut E)) -> Result<E, StoreError> {
        let mut rows = self.write()?;
        let row = rows.get_mut(id).ok_or(StoreError::NotFound)?;
        apply(row);
        Ok(row.clone())
    }

    pub fn remove(&self, id: &E::Id) -> Result<E, StoreError> {
        self.write()?.remove(id).ok_or(StoreError::NotFound)
    }

    pub fn len(&self) -> usize {
        self.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
