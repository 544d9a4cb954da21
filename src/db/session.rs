//! Unit-of-work sessions bound to an engine.

use super::engine::{Engine, EngineError};
use super::query::{push_value, Query};
use super::schema::quote_identifier;
use crate::model::{record_fields, Model, ModelError};
use crate::naming::TableNameRegistry;
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteConnection};
use sqlx::{QueryBuilder, Transaction};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Session is inactive after a failed flush and must be rolled back")]
    Inactive,
}

/// Session behaviour.
///
/// Sessions never auto-commit: all work happens inside a transaction that is
/// only made durable by [`Session::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Flush staged records before running queries.
    pub autoflush: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { autoflush: true }
    }
}

/// Produces sessions bound to one engine.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    engine: Arc<Engine>,
    registry: Arc<TableNameRegistry>,
    config: SessionConfig,
}

/// Session factory for `engine` with the default configuration
/// (no autocommit, autoflush on).
pub fn create_session_factory(engine: Arc<Engine>) -> SessionFactory {
    SessionFactory::new(engine, Arc::new(TableNameRegistry::new()))
}

impl SessionFactory {
    pub fn new(engine: Arc<Engine>, registry: Arc<TableNameRegistry>) -> Self {
        Self {
            engine,
            registry,
            config: SessionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Open a session; its transaction begins immediately.
    pub async fn session(&self) -> Result<Session, SessionError> {
        let tx = self.engine.pool().begin().await?;
        Ok(Session {
            tx,
            pending: VecDeque::new(),
            active: true,
            autoflush: self.config.autoflush,
            registry: Arc::clone(&self.registry),
        })
    }
}

struct PendingInsert {
    table: Arc<str>,
    fields: Vec<(String, Value)>,
}

/// Tracks staged records and runs statements inside one transaction.
///
/// Dropping a session without committing rolls back everything it did.
/// A failed flush deactivates the session: the failed record and the ones
/// after it stay staged, and every further operation except `rollback`
/// returns [`SessionError::Inactive`].
pub struct Session {
    tx: Transaction<'static, Sqlite>,
    pending: VecDeque<PendingInsert>,
    active: bool,
    autoflush: bool,
    registry: Arc<TableNameRegistry>,
}

impl Session {
    /// Stage `record` for insertion into its model's table.
    pub fn add<M: Model>(&mut self, record: &M) -> Result<(), SessionError> {
        let fields = record_fields(record)?;
        self.pending.push_back(PendingInsert {
            table: self.registry.table_name::<M>(),
            fields,
        });
        Ok(())
    }

    /// Number of staged, unflushed records.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// False once a flush has failed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Write all staged records to the database (still uncommitted).
    ///
    /// Records leave the staging queue only once their insert succeeded.
    pub async fn flush(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;

        let mut count = 0usize;
        while let Some(insert) = self.pending.front() {
            let mut builder = insert_statement(insert);
            if let Err(e) = builder.build().execute(&mut *self.tx).await {
                self.active = false;
                warn!(
                    table = %insert.table,
                    remaining = self.pending.len(),
                    error = %e,
                    "Flush failed; session must be rolled back"
                );
                return Err(e.into());
            }
            self.pending.pop_front();
            count += 1;
        }

        if count > 0 {
            debug!(count, "Flushed staged records");
        }
        Ok(())
    }

    /// Query builder for `M`'s table.
    pub fn query<M: Model>(&mut self) -> Query<'_, M> {
        Query::new(self)
    }

    /// Run a raw statement, returning the number of affected rows.
    pub async fn execute(&mut self, sql: &str) -> Result<u64, SessionError> {
        self.autoflush().await?;
        let result = sqlx::query(sql).execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    /// Flush staged records and commit the transaction.
    pub async fn commit(mut self) -> Result<(), SessionError> {
        self.flush().await?;
        self.tx.commit().await?;
        Ok(())
    }

    /// Discard staged records and roll back the transaction.
    pub async fn rollback(self) -> Result<(), SessionError> {
        self.tx.rollback().await?;
        Ok(())
    }

    pub fn table_name<M: Model>(&self) -> Arc<str> {
        self.registry.table_name::<M>()
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.active {
            Ok(())
        } else {
            Err(SessionError::Inactive)
        }
    }

    pub(crate) async fn autoflush(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.autoflush {
            self.flush().await?;
        }
        Ok(())
    }

    pub(crate) fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

fn insert_statement(insert: &PendingInsert) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {}", quote_identifier(&insert.table)));

    if insert.fields.is_empty() {
        builder.push(" DEFAULT VALUES");
        return builder;
    }

    let columns: Vec<String> = insert
        .fields
        .iter()
        .map(|(name, _)| quote_identifier(name))
        .collect();
    builder.push(format!(" ({}) VALUES (", columns.join(", ")));

    for (i, (_, value)) in insert.fields.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(&mut builder, value.clone());
    }
    builder.push(")");
    builder
}
