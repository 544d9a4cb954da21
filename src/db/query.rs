//! Query construction for model tables.

use super::schema::quote_identifier;
use super::session::{Session, SessionError};
use crate::model::Model;
use serde_json::Value;
use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, Row};
use std::marker::PhantomData;

/// Bind a JSON value as the closest SQLite type.
pub(crate) fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: Value) {
    match value {
        Value::Null => {
            builder.push_bind(None::<i64>);
        }
        Value::Bool(b) => {
            builder.push_bind(b);
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                builder.push_bind(i);
            } else {
                builder.push_bind(n.as_f64().unwrap_or(f64::NAN));
            }
        }
        Value::String(s) => {
            builder.push_bind(s);
        }
        other => {
            builder.push_bind(other.to_string());
        }
    }
}

/// SELECT over one model's table, executed inside a [`Session`].
///
/// Staged records are flushed first when the session has autoflush enabled.
pub struct Query<'s, M: Model> {
    session: &'s mut Session,
    filters: Vec<(String, Value)>,
    order: Vec<(String, bool)>,
    limit: Option<u64>,
    offset: Option<u64>,
    _model: PhantomData<fn() -> M>,
}

impl<'s, M: Model> Query<'s, M> {
    pub(crate) fn new(session: &'s mut Session) -> Self {
        Query {
            session,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            _model: PhantomData,
        }
    }

    /// Keep rows whose `column` equals `value`.
    pub fn filter_by(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), false));
        self
    }

    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), true));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub async fn all(self) -> Result<Vec<M>, SessionError> {
        self.session.autoflush().await?;
        let mut builder = QueryBuilder::new("");
        self.push_select(&mut builder);

        let rows = builder
            .build_query_as::<M>()
            .fetch_all(self.session.connection())
            .await?;
        Ok(rows)
    }

    pub async fn first(mut self) -> Result<Option<M>, SessionError> {
        self.limit = Some(1);
        self.session.autoflush().await?;
        let mut builder = QueryBuilder::new("");
        self.push_select(&mut builder);

        let row = builder
            .build_query_as::<M>()
            .fetch_optional(self.session.connection())
            .await?;
        Ok(row)
    }

    /// Number of rows the query would return.
    pub async fn count(self) -> Result<i64, SessionError> {
        self.session.autoflush().await?;
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM (");
        self.push_select(&mut builder);
        builder.push(")");

        let row = builder
            .build()
            .fetch_one(self.session.connection())
            .await?;
        Ok(row.try_get(0)?)
    }

    fn push_select(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        let table = self.session.table_name::<M>();
        builder.push(format!("SELECT * FROM {}", quote_identifier(&table)));

        for (i, (column, value)) in self.filters.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            if value.is_null() {
                builder.push(format!("{} IS NULL", quote_identifier(column)));
            } else {
                builder.push(format!("{} = ", quote_identifier(column)));
                push_value(builder, value.clone());
            }
        }

        if !self.order.is_empty() {
            let terms: Vec<String> = self
                .order
                .iter()
                .map(|(column, desc)| {
                    format!(
                        "{} {}",
                        quote_identifier(column),
                        if *desc { "DESC" } else { "ASC" }
                    )
                })
                .collect();
            builder.push(format!(" ORDER BY {}", terms.join(", ")));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                builder.push(format!(" LIMIT {} OFFSET {}", limit, offset));
            }
            (Some(limit), None) => {
                builder.push(format!(" LIMIT {}", limit));
            }
            (None, Some(offset)) => {
                builder.push(format!(" LIMIT -1 OFFSET {}", offset));
            }
            (None, None) => {}
        }
    }
}
