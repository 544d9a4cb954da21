//! Engine construction and per-connector engine caching.

use crate::config::{ConfigError, ConnectionConfig, EngineOptions};
use async_trait::async_trait;
use log::LevelFilter;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid engine option: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Builds engines from a driver connect string and engine options.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    type Engine: Send + Sync;

    async fn create_engine(
        &self,
        info: &str,
        options: &EngineOptions,
    ) -> Result<Self::Engine, EngineError>;
}

/// A pooled SQLite database handle.
#[derive(Debug, Clone)]
pub struct Engine {
    pool: SqlitePool,
    echo: bool,
}

impl Engine {
    pub fn new(pool: SqlitePool, echo: bool) -> Self {
        Engine { pool, echo }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether executed statements are logged at INFO.
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Round-trip a trivial query through the pool.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Creates [`Engine`]s backed by `sqlx` SQLite pools.
///
/// Recognized options:
/// - `echo`: log every statement at INFO (otherwise statement logging is off)
/// - `pool_size`: maximum pooled connections
/// - `pool_timeout`: seconds to wait for a free connection
/// - `pool_recycle`: seconds after which a connection is replaced
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteEngineFactory;

#[async_trait]
impl EngineFactory for SqliteEngineFactory {
    type Engine = Engine;

    async fn create_engine(
        &self,
        info: &str,
        options: &EngineOptions,
    ) -> Result<Engine, EngineError> {
        let echo = options.echo()?.unwrap_or(false);

        let mut connect = SqliteConnectOptions::from_str(info)?;
        connect = if echo {
            connect.log_statements(LevelFilter::Info)
        } else {
            connect.disable_statement_logging()
        };

        let mut pool_options = SqlitePoolOptions::new();
        if let Some(size) = options.pool_size()? {
            pool_options = pool_options.max_connections(size);
        }
        if let Some(timeout) = options.pool_timeout()? {
            pool_options = pool_options.acquire_timeout(timeout);
        }
        if let Some(recycle) = options.pool_recycle()? {
            pool_options = pool_options.max_lifetime(recycle);
        }

        // Connect eagerly so unreachable databases fail here rather than on first query.
        let pool = pool_options.connect_with(connect).await?;
        Ok(Engine::new(pool, echo))
    }
}

/// Identity of a cached engine: the URI plus the raw `echo` option.
type CacheKey = (String, Option<Value>);

struct Cached<E> {
    key: CacheKey,
    engine: Arc<E>,
}

/// Holds at most one engine, rebuilt whenever `(uri, echo)` changes.
///
/// The lock is held across construction, so concurrent callers never build
/// more than one engine for the same key. A failed construction leaves the
/// previous engine (if any) cached and is returned to the caller as is.
pub struct EngineConnector<F: EngineFactory = SqliteEngineFactory> {
    factory: F,
    state: Mutex<Option<Cached<F::Engine>>>,
}

impl<F: EngineFactory> EngineConnector<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: Mutex::new(None),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Engine for the current `config`, reusing the cached one when its
    /// `(uri, echo)` key is unchanged.
    pub async fn get_engine(&self, config: &ConnectionConfig) -> Result<Arc<F::Engine>, EngineError> {
        let mut state = self.state.lock().await;
        let key: CacheKey = (config.uri.clone(), config.options.get("echo").cloned());

        if let Some(cached) = state.as_ref() {
            if cached.key == key {
                debug!(uri = %config.uri, "Reusing cached database engine");
                return Ok(Arc::clone(&cached.engine));
            }
        }

        info!(uri = %config.uri, echo = ?key.1, "Creating database engine");
        let engine = match self.factory.create_engine(&config.info, &config.options).await {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                warn!(uri = %config.uri, error = %e, "Database engine creation failed");
                return Err(e);
            }
        };

        *state = Some(Cached {
            key,
            engine: Arc::clone(&engine),
        });
        Ok(engine)
    }
}

impl Default for EngineConnector<SqliteEngineFactory> {
    fn default() -> Self {
        Self::new(SqliteEngineFactory)
    }
}
