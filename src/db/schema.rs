//! Table definitions bound to a shared metadata collection.

use super::engine::{Engine, EngineError};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Table {0} is already defined in this metadata")]
    DuplicateTable(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Double-quote an SQL identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
    pub primary_key: bool,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Table {
            name: name.into(),
            columns,
        }
    }

    pub fn create_sql(&self) -> String {
        let primary: Vec<&Column> = self.columns.iter().filter(|c| c.primary_key).collect();
        let inline_pk = primary.len() == 1;

        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", quote_identifier(&c.name), c.sql_type);
                if c.primary_key && inline_pk {
                    def.push_str(" PRIMARY KEY");
                } else if !c.nullable {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect();

        if primary.len() > 1 {
            let keys: Vec<String> = primary.iter().map(|c| quote_identifier(&c.name)).collect();
            parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.name),
            parts.join(", ")
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.name))
    }
}

/// Ordered collection of table definitions.
#[derive(Debug, Default)]
pub struct MetaData {
    tables: Mutex<Vec<Table>>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a table and register it with this metadata.
    pub fn table(&self, name: impl Into<String>, columns: Vec<Column>) -> Result<Table, SchemaError> {
        let table = Table::new(name, columns);
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if tables.iter().any(|t| t.name == table.name) {
            return Err(SchemaError::DuplicateTable(table.name));
        }
        tables.push(table.clone());
        Ok(table)
    }

    /// Registered tables in definition order.
    pub fn tables(&self) -> Vec<Table> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create every registered table that does not exist yet.
    pub async fn create_all(&self, engine: &Engine) -> Result<(), SchemaError> {
        let tables = self.tables();
        let mut tx = engine.pool().begin().await?;
        for table in &tables {
            sqlx::query(&table.create_sql()).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(count = tables.len(), "Created tables");
        Ok(())
    }

    /// Drop every registered table, most recently defined first.
    pub async fn drop_all(&self, engine: &Engine) -> Result<(), SchemaError> {
        let tables = self.tables();
        let mut tx = engine.pool().begin().await?;
        for table in tables.iter().rev() {
            sqlx::query(&table.drop_sql()).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(count = tables.len(), "Dropped tables");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sql_with_inline_primary_key() {
        let table = Table::new(
            "users",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("name", "TEXT").not_null(),
                Column::new("bio", "TEXT"),
            ],
        );
        assert_eq!(
            table.create_sql(),
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" INTEGER PRIMARY KEY, "name" TEXT NOT NULL, "bio" TEXT)"#
        );
    }

    #[test]
    fn test_create_sql_with_composite_primary_key() {
        let table = Table::new(
            "memberships",
            vec![
                Column::new("user_id", "INTEGER").primary_key(),
                Column::new("group_id", "INTEGER").primary_key(),
            ],
        );
        assert_eq!(
            table.create_sql(),
            r#"CREATE TABLE IF NOT EXISTS "memberships" ("user_id" INTEGER NOT NULL, "group_id" INTEGER NOT NULL, PRIMARY KEY ("user_id", "group_id"))"#
        );
    }

    #[test]
    fn test_identifiers_are_escaped() {
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(
            Table::new("t", vec![]).drop_sql(),
            r#"DROP TABLE IF EXISTS "t""#
        );
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let metadata = MetaData::new();
        metadata
            .table("users", vec![Column::new("id", "INTEGER").primary_key()])
            .unwrap();

        let result = metadata.table("users", vec![]);
        assert!(matches!(result, Err(SchemaError::DuplicateTable(name)) if name == "users"));
        assert_eq!(metadata.tables().len(), 1);
    }
}
