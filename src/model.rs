//! Base trait for user-defined record types.

use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use thiserror::Error;

/// A record type stored in its own table.
///
/// The table name is resolved through [`crate::naming::TableNameRegistry`]:
/// `TABLE_NAME` when set, otherwise derived from `class_name()`.
pub trait Model: Serialize + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    /// Explicit table name; `None` derives one from the class name.
    const TABLE_NAME: Option<&'static str> = None;

    /// Unqualified type name, e.g. `UserAccount`.
    fn class_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Human-readable form, `<ClassName>`.
    fn repr(&self) -> String {
        format!("<{}>", Self::class_name())
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Record {0} does not serialize to a map of fields")]
    NotAnObject(&'static str),
}

/// Public `(field, value)` pairs of a record.
///
/// Fields whose serialized name starts with `_` are skipped. Order follows the
/// serialized map and is not guaranteed to match declaration order.
pub fn record_fields<M: Model>(record: &M) -> Result<Vec<(String, Value)>, ModelError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .collect()),
        _ => Err(ModelError::NotAnObject(M::class_name())),
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
