//! Request-scoped database sessions.

use crate::db::{Database, Session};
use crate::error::AppError;
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::sync::Arc;

/// A session opened for the current request.
///
/// The session lives as long as the handler holds it. Work that the handler
/// does not commit is rolled back when the request finishes.
pub struct DbSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for DbSession
where
    Arc<Database>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let db = Arc::<Database>::from_ref(state);
        let session = db.session().await?;
        Ok(DbSession(session))
    }
}
