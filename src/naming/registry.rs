//! Per-type memoization of derived table names.

use super::table_name;
use crate::model::Model;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Registry mapping model types to their table names.
///
/// A name is derived from the type's own class name on first lookup and
/// returned unchanged on every later lookup. Types declaring
/// `Model::TABLE_NAME` bypass derivation entirely.
#[derive(Debug, Default)]
pub struct TableNameRegistry {
    names: Mutex<HashMap<TypeId, Arc<str>>>,
}

impl TableNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table name for `M`, deriving and storing it on first use.
    pub fn table_name<M: Model>(&self) -> Arc<str> {
        if let Some(explicit) = M::TABLE_NAME {
            return Arc::from(explicit);
        }

        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        names
            .entry(TypeId::of::<M>())
            .or_insert_with(|| {
                let derived = table_name(M::class_name());
                debug!(class = M::class_name(), table = %derived, "Derived table name");
                Arc::from(derived)
            })
            .clone()
    }

    /// Number of names derived so far.
    pub fn computed_count(&self) -> usize {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
