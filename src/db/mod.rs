//! Database integration layer.
//!
//! This module provides:
//! - Engine creation and caching (`engine`)
//! - Sessions and their query builder (`session`, `query`)
//! - Table definitions and `create_all` / `drop_all` (`schema`)
//! - `Database`, which ties them to one live connection configuration

pub mod engine;
pub mod query;
pub mod schema;
pub mod session;

pub use engine::{Engine, EngineConnector, EngineError, EngineFactory, SqliteEngineFactory};
pub use query::Query;
pub use schema::{Column, MetaData, SchemaError, Table};
pub use session::{create_session_factory, Session, SessionConfig, SessionError, SessionFactory};

use crate::config::{ConnectionConfig, EngineOptions};
use crate::model::Model;
use crate::naming::TableNameRegistry;
use std::sync::{Arc, PoisonError, RwLock};

/// Owns the connection configuration, the engine cache, the table-name
/// registry and the table metadata of one application.
///
/// Configuration may be changed at any time; the next [`Database::engine`]
/// call reads it again and rebuilds the engine if the URI or `echo` changed.
pub struct Database {
    config: RwLock<ConnectionConfig>,
    connector: EngineConnector,
    registry: Arc<TableNameRegistry>,
    metadata: MetaData,
    session_config: SessionConfig,
}

impl Database {
    pub fn new(config: ConnectionConfig) -> Self {
        Database {
            config: RwLock::new(config),
            connector: EngineConnector::default(),
            registry: Arc::new(TableNameRegistry::new()),
            metadata: MetaData::new(),
            session_config: SessionConfig::default(),
        }
    }

    pub fn with_session_config(mut self, session_config: SessionConfig) -> Self {
        self.session_config = session_config;
        self
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ConnectionConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point at another database; the driver connect string follows the URI.
    pub fn set_uri(&self, uri: impl Into<String>) {
        let uri = uri.into();
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.info = uri.clone();
        config.uri = uri;
    }

    pub fn set_options(&self, options: EngineOptions) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .options = options;
    }

    pub async fn engine(&self) -> Result<Arc<Engine>, EngineError> {
        let config = self.config();
        self.connector.get_engine(&config).await
    }

    pub async fn session_factory(&self) -> Result<SessionFactory, EngineError> {
        let engine = self.engine().await?;
        Ok(SessionFactory::new(engine, Arc::clone(&self.registry)).with_config(self.session_config))
    }

    pub async fn session(&self) -> Result<Session, SessionError> {
        self.session_factory().await?.session().await
    }

    pub fn table_name<M: Model>(&self) -> Arc<str> {
        self.registry.table_name::<M>()
    }

    pub fn registry(&self) -> &Arc<TableNameRegistry> {
        &self.registry
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    pub async fn create_all(&self) -> Result<(), SchemaError> {
        let engine = self.engine().await?;
        self.metadata.create_all(&engine).await
    }

    pub async fn drop_all(&self) -> Result<(), SchemaError> {
        let engine = self.engine().await?;
        self.metadata.drop_all(&engine).await
    }
}
