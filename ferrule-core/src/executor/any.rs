//! sqlx-backed pool over the `Any` driver.
//!
//! Enable the `postgres`, `mysql` or `sqlite` feature for the drivers the
//! connection URL may select. Builders emit `?` placeholders; on PostgreSQL
//! they are renumbered to `$1..$n` before the statement is sent.

use super::{Connection, ConnectionPool};
use crate::row::Row;
use crate::{Error, Result, Value};
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column as _, Row as _};
use std::borrow::Cow;
use std::fmt::Write as _;

/// Connection pool wrapper around [`sqlx::AnyPool`]
#[derive(Debug, Clone)]
pub struct SqlxPool {
    inner: AnyPool,
}

impl SqlxPool {
    /// Connect to `database_url`, e.g. `sqlite::memory:` or `postgres://...`
    pub async fn connect(database_url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPool::connect(database_url).await?;
        Ok(Self { inner: pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: AnyPool) -> Self {
        Self { inner: pool }
    }

    pub fn inner(&self) -> &AnyPool {
        &self.inner
    }
}

impl ConnectionPool for SqlxPool {
    type Connection = SqlxConnection;

    async fn acquire(&self) -> Result<SqlxConnection> {
        Ok(SqlxConnection {
            inner: Some(self.inner.acquire().await?),
            in_transaction: false,
            statement: String::new(),
        })
    }
}

/// A pooled sqlx connection
#[derive(Debug)]
pub struct SqlxConnection {
    inner: Option<PoolConnection<Any>>,
    in_transaction: bool,
    // renumbered text of the statement a `fetch` stream borrows
    statement: String,
}

impl SqlxConnection {
    fn conn(&mut self) -> Result<&mut PoolConnection<Any>> {
        self.inner
            .as_mut()
            .ok_or_else(|| Error::driver("connection was already released"))
    }

    /// `sql` in the placeholder syntax of the connected backend
    fn dialect<'s>(&mut self, sql: &'s str) -> Result<Cow<'s, str>> {
        Ok(placeholders_for(self.conn()?.backend_name(), sql))
    }

    async fn run(&mut self, sql: &'static str) -> Result<()> {
        sqlx::query(sql).execute(&mut **self.conn()?).await?;
        Ok(())
    }
}

impl Connection for SqlxConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let sql = self.dialect(sql)?;
        let result = bind_values(sqlx::query(&sql), params)
            .execute(&mut **self.conn()?)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let sql = self.dialect(sql)?;
        let rows = bind_values(sqlx::query(&sql), params)
            .fetch_all(&mut **self.conn()?)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    fn fetch<'c>(&'c mut self, sql: &'c str, params: &'c [Value]) -> BoxStream<'c, Result<Row>> {
        let SqlxConnection {
            inner, statement, ..
        } = self;
        let Some(conn) = inner.as_mut() else {
            return futures::stream::once(async {
                Err(Error::driver("connection was already released"))
            })
            .boxed();
        };
        let sql: &'c str = match placeholders_for(conn.backend_name(), sql) {
            Cow::Borrowed(sql) => sql,
            Cow::Owned(numbered) => {
                *statement = numbered;
                let statement: &'c String = statement;
                statement.as_str()
            }
        };
        bind_values(sqlx::query(sql), params)
            .fetch(&mut **conn)
            .map(|row| decode_row(&row?))
            .boxed()
    }

    async fn begin(&mut self) -> Result<()> {
        self.run("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.run("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn release(mut self) -> Result<()> {
        // dropping a pool connection hands it back to the pool
        drop(self.inner.take());
        Ok(())
    }
}

impl Drop for SqlxConnection {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Some(conn) = self.inner.take() {
                // an open transaction must not go back into the pool
                tracing::warn!(target: "ferrule::sql", "closing connection with an open transaction");
                drop(conn.detach());
            }
        }
    }
}

fn placeholders_for<'s>(backend: &str, sql: &'s str) -> Cow<'s, str> {
    if backend == "PostgreSQL" {
        numbered_placeholders(sql)
    } else {
        Cow::Borrowed(sql)
    }
}

/// Rewrite `?` as `$1..$n`, leaving quoted literals and identifiers alone
fn numbered_placeholders(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }
    let mut numbered = String::with_capacity(sql.len() + 8);
    let mut quote = None;
    let mut index = 0;
    for ch in sql.chars() {
        match (quote, ch) {
            (None, '\'' | '"') => quote = Some(ch),
            (Some(open), _) if open == ch => quote = None,
            (None, '?') => {
                index += 1;
                let _ = write!(numbered, "${}", index);
                continue;
            }
            _ => {}
        }
        numbered.push(ch);
    }
    Cow::Owned(numbered)
}

/// Bind values to a sqlx query
fn bind_values<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &'q [Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i32>),
            Value::Bool(b) => query.bind(*b),
            Value::I16(i) => query.bind(*i),
            Value::I32(i) => query.bind(*i),
            Value::I64(i) => query.bind(*i),
            Value::F32(f) => query.bind(*f),
            Value::F64(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Json(j) => query.bind(j.to_string()),
            Value::Uuid(u) => query.bind(u.to_string()),
        };
    }
    query
}

/// Read every column of `row` into a [`Value`], trying the types the `Any` driver can decode
fn decode_row(row: &AnyRow) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.columns().len());
    let mut values = Vec::with_capacity(row.columns().len());

    for (index, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            v.map(Value::I64)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            v.map(Value::F64)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            v.map(Value::String)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
            v.map(Value::Bool)
        } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
            v.map(Value::Bytes)
        } else {
            return Err(Error::mapping(format!(
                "unsupported type for column '{}'",
                column.name()
            )));
        };

        columns.push(column.name().to_string());
        values.push(value.unwrap_or(Value::Null));
    }

    Row::new(columns, values)
}
