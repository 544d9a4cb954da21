pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod naming;
pub mod prelude;

pub use config::{ConnectionConfig, DatabaseConfig, EngineOptions};
pub use db::{Database, Engine, EngineConnector, Session, SessionFactory};
pub use error::AppError;
pub use model::Model;
pub use naming::{table_name, TableNameRegistry};
