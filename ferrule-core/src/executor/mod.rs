//! Statement execution over a pluggable connection source.
//!
//! [`ConnectionPool`] and [`Connection`] are the only seams to a driver;
//! [`any::SqlxPool`] implements them over sqlx's `Any` driver. Everything
//! above them ([`Database`], [`Transaction`], [`RowStream`]) is driver-neutral.

pub mod any;
mod database;
mod stream;

pub use any::{SqlxConnection, SqlxPool};
pub use database::{Database, Transaction};
pub use stream::RowStream;

use crate::row::Row;
use crate::{Result, Value};
use futures::stream::BoxStream;
use std::future::Future;

/// A source of database connections
pub trait ConnectionPool: Send + Sync + Clone + 'static {
    /// The connection type for this pool
    type Connection: Connection;

    /// Acquire a connection, owned exclusively until released
    fn acquire(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// One exclusively owned database connection
pub trait Connection: Send + 'static {
    /// Run a statement and return the affected-row count
    fn execute(&mut self, sql: &str, params: &[Value]) -> impl Future<Output = Result<u64>> + Send;

    /// Run a query and collect every row
    fn fetch_all(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Run a query and yield rows as the cursor produces them
    fn fetch<'c>(&'c mut self, sql: &'c str, params: &'c [Value]) -> BoxStream<'c, Result<Row>>;

    /// Turn auto-commit off until `commit` or `rollback`
    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Hand the connection back to its pool
    fn release(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

/// Release `conn`, logging instead of returning a failure so it never masks the statement's own result
pub(crate) async fn release<C: Connection>(conn: C) {
    if let Err(error) = conn.release().await {
        tracing::warn!(target: "ferrule::sql", %error, "failed to release connection");
    }
}
