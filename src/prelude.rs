//! Everything a model module usually needs, in one import.

pub use crate::config::{ConnectionConfig, DatabaseConfig, EngineOptions};
pub use crate::db::{
    create_session_factory, Column, Database, Engine, MetaData, Query, Session, SessionConfig,
    SessionFactory, Table,
};
pub use crate::model::{record_fields, Model};
pub use crate::naming::table_name;
pub use sqlx::sqlite::{SqlitePool, SqliteRow};
pub use sqlx::{FromRow, Row};
