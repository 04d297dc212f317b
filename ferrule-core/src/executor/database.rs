use super::{release, Connection, ConnectionPool, RowStream};
use crate::builder::{
    BatchOptions, DeleteBuilderInitial, InsertBuilder, QueryBuilder, SelectBuilder, Statement,
    UpdateBuilder, UpdateOptions,
};
use crate::condition::Condition;
use crate::config::{self, Settings};
use crate::entity::{Entity, TableMeta};
use crate::page::Page;
use crate::row::{FieldHints, Row};
use crate::{Error, Result, Value};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Runtime handle: a connection pool plus the settings every statement is built with
#[derive(Debug, Clone)]
pub struct Database<P> {
    pool: P,
    settings: Arc<Settings>,
}

/// Fires the pre-execution hook and starts the clock
fn before(settings: &Settings, statement: &Statement) -> Instant {
    settings.audit().fire_before(&statement.sql, &statement.params);
    debug!(
        target: "ferrule::sql",
        sql = %statement.sql,
        params = statement.params.len(),
        "executing statement"
    );
    Instant::now()
}

fn after(settings: &Settings, statement: &Statement, started: Instant) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    debug!(target: "ferrule::sql", sql = %statement.sql, elapsed_ms, "statement succeeded");
    settings
        .audit()
        .fire_after(&statement.sql, &statement.params, elapsed_ms);
}

fn decode_all<T: Entity>(rows: &[Row], meta: &TableMeta, hints: &FieldHints) -> Result<Vec<T>> {
    rows.iter().map(|row| row.decode(meta, hints)).collect()
}

fn first_value(rows: Vec<Row>) -> Option<Value> {
    rows.into_iter()
        .next()
        .and_then(|row| row.into_values().into_iter().next())
}

/// Builder defaults shared by pool and transaction reads
fn prepare<T: Entity>(settings: &Settings, builder: SelectBuilder) -> (SelectBuilder, Arc<TableMeta>) {
    let meta = settings.meta::<T>();
    let builder = builder.naming(settings.naming().clone()).or_from(&meta.table);
    (builder, meta)
}

fn count_from(value: Option<Value>) -> Result<u64> {
    match value {
        None => Ok(0),
        Some(value) => value
            .as_i64()
            .map(|n| u64::try_from(n).unwrap_or(0))
            .ok_or_else(|| Error::mapping(format!("count returned a {} value", value.type_name()))),
    }
}

impl<P: ConnectionPool> Database<P> {
    pub fn new(pool: P, settings: Arc<Settings>) -> Self {
        Self { pool, settings }
    }

    /// Use the settings installed with [`config::init`]
    pub fn from_global(pool: P) -> Result<Self> {
        Ok(Self::new(pool, config::global()?))
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// A select builder using the configured naming
    pub fn select(&self) -> SelectBuilder {
        SelectBuilder::with_naming(self.settings.naming().clone())
    }

    /// A select builder reading from `T`'s table
    pub fn select_from<T: Entity>(&self) -> SelectBuilder {
        self.select().from(self.settings.meta::<T>().table.clone())
    }

    async fn run_execute(&self, statement: &Statement) -> Result<u64> {
        let started = before(&self.settings, statement);
        let mut conn = self.pool.acquire().await?;
        let result = conn.execute(&statement.sql, &statement.params).await;
        release(conn).await;
        let affected = result?;
        after(&self.settings, statement, started);
        Ok(affected)
    }

    async fn run_fetch(&self, statement: &Statement) -> Result<Vec<Row>> {
        let started = before(&self.settings, statement);
        let mut conn = self.pool.acquire().await?;
        let result = conn.fetch_all(&statement.sql, &statement.params).await;
        release(conn).await;
        let rows = result?;
        after(&self.settings, statement, started);
        Ok(rows)
    }

    /// Run a caller-assembled statement
    pub async fn execute(&self, statement: &Statement) -> Result<u64> {
        self.run_execute(statement).await
    }

    /// Every row matched by `builder`; the table defaults to `T`'s
    pub async fn query<T: Entity>(&self, builder: SelectBuilder) -> Result<Vec<T>> {
        self.query_with_hints(builder, &FieldHints::new()).await
    }

    /// Like [`query`](Self::query), with per-field type hints for this call only
    pub async fn query_with_hints<T: Entity>(
        &self,
        builder: SelectBuilder,
        hints: &FieldHints,
    ) -> Result<Vec<T>> {
        let (builder, meta) = prepare::<T>(&self.settings, builder);
        let rows = self.run_fetch(&builder.build()?).await?;
        decode_all(&rows, &meta, hints)
    }

    /// The first matching row, fetched with `limit 1`
    pub async fn query_one<T: Entity>(&self, builder: SelectBuilder) -> Result<Option<T>> {
        Ok(self.query(builder.limit(1)).await?.into_iter().next())
    }

    /// Read from `T`'s table but map rows onto `R`
    pub async fn query_as<T: Entity, R: Entity>(&self, builder: SelectBuilder) -> Result<Vec<R>> {
        let (builder, _) = prepare::<T>(&self.settings, builder);
        let rows = self.run_fetch(&builder.build()?).await?;
        decode_all(&rows, &self.settings.meta::<R>(), &FieldHints::new())
    }

    /// First column of the first row, e.g. an aggregate
    pub async fn query_value(&self, builder: SelectBuilder) -> Result<Option<Value>> {
        let builder = builder.naming(self.settings.naming().clone());
        Ok(first_value(self.run_fetch(&builder.build()?).await?))
    }

    /// Rows produced lazily as the consumer reads them
    pub async fn query_stream<T: Entity>(&self, builder: SelectBuilder) -> Result<RowStream<T>> {
        let (builder, meta) = prepare::<T>(&self.settings, builder);
        let statement = builder.build()?;
        let started = before(&self.settings, &statement);
        let conn = self.pool.acquire().await?;
        Ok(RowStream::spawn(
            conn,
            statement,
            Arc::clone(&self.settings),
            meta,
            FieldHints::new(),
            started,
        ))
    }

    /// One page of results plus the total row count.
    ///
    /// `page_number` is 1-based.
    pub async fn paginate<T: Entity>(
        &self,
        builder: SelectBuilder,
        page_number: u64,
        page_size: u64,
    ) -> Result<Page<T>> {
        if page_number == 0 || page_size == 0 {
            return Err(Error::invalid_input(format!(
                "invalid page {} of size {}",
                page_number, page_size
            )));
        }
        let (builder, _) = prepare::<T>(&self.settings, builder);
        let total_row = count_from(self.query_value(builder.count_query()).await?)?;
        let records = self
            .query(builder.limit_page(page_size, page_number))
            .await?;
        Ok(Page::new(page_number, page_size, total_row, records))
    }

    /// Insert one entity
    pub async fn insert<T: Entity>(&self, entity: &T) -> Result<u64> {
        let insert = InsertBuilder::for_entity(&self.settings, entity)?;
        self.run_execute(&insert.build()?).await
    }

    /// Insert every entity on one connection, all or nothing
    pub async fn insert_batch<T: Entity>(&self, entities: &[T]) -> Result<u64> {
        self.insert_batch_with(entities, BatchOptions::default()).await
    }

    pub async fn insert_batch_with<T: Entity>(
        &self,
        entities: &[T],
        options: BatchOptions,
    ) -> Result<u64> {
        let statements = InsertBuilder::for_entities(&self.settings, entities, options)?.statements()?;

        let mut tx = self.begin().await?;
        let mut affected = 0;
        for statement in &statements {
            match tx.execute(statement).await {
                Ok(count) => affected += count,
                Err(error) => {
                    warn!(target: "ferrule::sql", %error, rows = statements.len(), "batch insert failed, rolling back");
                    if let Err(rollback_error) = tx.rollback().await {
                        warn!(target: "ferrule::sql", error = %rollback_error, "rollback failed");
                    }
                    return Err(error);
                }
            }
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Update rows of `T` matching `condition` from the fields of `entity`
    pub async fn update<T: Entity>(
        &self,
        entity: &T,
        options: UpdateOptions,
        condition: Condition,
    ) -> Result<u64> {
        let update = UpdateBuilder::for_entity(&self.settings, entity, options)?.where_(condition);
        self.run_execute(&update.build()?).await
    }

    /// Update the row identified by `entity`'s key fields
    pub async fn update_by_id<T: Entity>(&self, entity: &T, options: UpdateOptions) -> Result<u64> {
        let update = UpdateBuilder::for_entity(&self.settings, entity, options)?.by_id()?;
        self.run_execute(&update.build()?).await
    }

    /// Delete rows of `T`; becomes an update when logical delete is on
    pub async fn delete<T: Entity>(&self, condition: Condition) -> Result<u64> {
        let delete = DeleteBuilderInitial::for_entity::<T>(&self.settings).where_(condition);
        self.run_execute(&delete.build()?).await
    }

    pub async fn delete_by_id<T: Entity>(&self, entity: &T) -> Result<u64> {
        let delete = DeleteBuilderInitial::by_id(&self.settings, entity)?;
        self.run_execute(&delete.build()?).await
    }

    /// Start a transaction on a dedicated connection
    pub async fn begin(&self) -> Result<Transaction<P>> {
        let mut conn = self.pool.acquire().await?;
        if let Err(error) = conn.begin().await {
            release(conn).await;
            return Err(error);
        }
        Ok(Transaction {
            conn: Some(conn),
            settings: Arc::clone(&self.settings),
        })
    }

    /// Run `f` in a transaction, committing on `Ok` and rolling back on `Err`
    ///
    /// ```no_run
    /// # use ferrule_core::{Database, Result, executor::SqlxPool};
    /// # async fn demo(db: Database<SqlxPool>) -> Result<()> {
    /// let moved = db
    ///     .transaction(|tx| {
    ///         Box::pin(async move {
    ///             let statement = ferrule_core::Statement::new("update accounts set balance = balance - 10", vec![]);
    ///             tx.execute(&statement).await
    ///         })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut Transaction<P>) -> BoxFuture<'t, Result<R>> + Send,
    {
        let mut tx = self.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(target: "ferrule::sql", error = %rollback_error, "rollback failed");
                }
                Err(error)
            }
        }
    }
}

/// A transaction holding one connection until `commit` or `rollback`
pub struct Transaction<P: ConnectionPool> {
    conn: Option<P::Connection>,
    settings: Arc<Settings>,
}

impl<P: ConnectionPool> Transaction<P> {
    fn conn(&mut self) -> Result<&mut P::Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::driver("transaction is already finished"))
    }

    async fn run_execute(&mut self, statement: &Statement) -> Result<u64> {
        let started = before(&self.settings, statement);
        let affected = self
            .conn()?
            .execute(&statement.sql, &statement.params)
            .await?;
        after(&self.settings, statement, started);
        Ok(affected)
    }

    async fn run_fetch(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        let started = before(&self.settings, statement);
        let rows = self
            .conn()?
            .fetch_all(&statement.sql, &statement.params)
            .await?;
        after(&self.settings, statement, started);
        Ok(rows)
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn select(&self) -> SelectBuilder {
        SelectBuilder::with_naming(self.settings.naming().clone())
    }

    pub async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        self.run_execute(statement).await
    }

    pub async fn query<T: Entity>(&mut self, builder: SelectBuilder) -> Result<Vec<T>> {
        self.query_with_hints(builder, &FieldHints::new()).await
    }

    pub async fn query_with_hints<T: Entity>(
        &mut self,
        builder: SelectBuilder,
        hints: &FieldHints,
    ) -> Result<Vec<T>> {
        let (builder, meta) = prepare::<T>(&self.settings, builder);
        let rows = self.run_fetch(&builder.build()?).await?;
        decode_all(&rows, &meta, hints)
    }

    pub async fn query_one<T: Entity>(&mut self, builder: SelectBuilder) -> Result<Option<T>> {
        Ok(self.query(builder.limit(1)).await?.into_iter().next())
    }

    pub async fn query_value(&mut self, builder: SelectBuilder) -> Result<Option<Value>> {
        let builder = builder.naming(self.settings.naming().clone());
        Ok(first_value(self.run_fetch(&builder.build()?).await?))
    }

    pub async fn insert<T: Entity>(&mut self, entity: &T) -> Result<u64> {
        let insert = InsertBuilder::for_entity(&self.settings, entity)?;
        self.run_execute(&insert.build()?).await
    }

    /// Insert every entity inside this transaction; the caller decides whether to commit
    pub async fn insert_batch_with<T: Entity>(
        &mut self,
        entities: &[T],
        options: BatchOptions,
    ) -> Result<u64> {
        let statements = InsertBuilder::for_entities(&self.settings, entities, options)?.statements()?;
        let mut affected = 0;
        for statement in &statements {
            affected += self.run_execute(statement).await?;
        }
        Ok(affected)
    }

    pub async fn update<T: Entity>(
        &mut self,
        entity: &T,
        options: UpdateOptions,
        condition: Condition,
    ) -> Result<u64> {
        let update = UpdateBuilder::for_entity(&self.settings, entity, options)?.where_(condition);
        self.run_execute(&update.build()?).await
    }

    pub async fn update_by_id<T: Entity>(&mut self, entity: &T, options: UpdateOptions) -> Result<u64> {
        let update = UpdateBuilder::for_entity(&self.settings, entity, options)?.by_id()?;
        self.run_execute(&update.build()?).await
    }

    pub async fn delete<T: Entity>(&mut self, condition: Condition) -> Result<u64> {
        let delete = DeleteBuilderInitial::for_entity::<T>(&self.settings).where_(condition);
        self.run_execute(&delete.build()?).await
    }

    pub async fn delete_by_id<T: Entity>(&mut self, entity: &T) -> Result<u64> {
        let delete = DeleteBuilderInitial::by_id(&self.settings, entity)?;
        self.run_execute(&delete.build()?).await
    }

    /// Commit and release the connection
    pub async fn commit(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Err(Error::driver("transaction is already finished"));
        };
        let result = conn.commit().await;
        release(conn).await;
        result
    }

    /// Roll back and release the connection
    pub async fn rollback(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Err(Error::driver("transaction is already finished"));
        };
        let result = conn.rollback().await;
        release(conn).await;
        result
    }
}

impl<P: ConnectionPool> Drop for Transaction<P> {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!(target: "ferrule::sql", "transaction dropped without commit or rollback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{col, Predicate};
    use crate::config::{AuditHooks, LogicDelete};
    use crate::entity::fixtures::{CourseRecord, Student};
    use crate::executor::mock::MockPool;
    use crate::keygen::KeyStrategy;

    fn student(id: i64, age: i32) -> Student {
        Student {
            id,
            name: Some(format!("student-{}", id)),
            age: Some(age),
        }
    }

    fn recording_database(pool: &MockPool) -> Database<MockPool> {
        let before = pool.clone();
        let after = pool.clone();
        let audit = AuditHooks::new()
            .before(move |_, _| before.record("before"))
            .after(move |_, _, _| after.record("after"));
        let settings = Settings::builder().audit(audit).build().unwrap();
        Database::new(pool.clone(), Arc::new(settings))
    }

    #[tokio::test]
    async fn test_hook_order_on_success() {
        let pool = MockPool::new();
        let db = recording_database(&pool);

        db.insert(&student(1, 20)).await.unwrap();
        assert_eq!(
            pool.events(),
            vec![
                "before",
                "acquire",
                "execute: insert into students (id, name, age) values (?, ?, ?)",
                "release",
                "after",
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_still_fires_before_and_releases() {
        let pool = MockPool::new();
        pool.fail_when("insert into");
        let db = recording_database(&pool);

        assert!(db.insert(&student(1, 20)).await.is_err());
        let events = pool.events();
        assert_eq!(events.first().map(String::as_str), Some("before"));
        assert!(events.iter().any(|e| e == "release"));
        assert!(!events.iter().any(|e| e == "after"));
        assert_eq!(pool.released(), 1);
    }

    #[tokio::test]
    async fn test_release_failure_does_not_mask_result() {
        let pool = MockPool::new();
        pool.fail_release();
        let db = recording_database(&pool);

        assert_eq!(db.insert(&student(1, 20)).await.unwrap(), 1);
        assert!(pool.events().iter().any(|e| e == "after"));
    }

    #[tokio::test]
    async fn test_acquire_failure_after_before_hook() {
        let pool = MockPool::new();
        pool.fail_acquire();
        let db = recording_database(&pool);

        let err = db.execute(&Statement::new("delete from t where 1 = 1", vec![])).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Database);
        assert_eq!(pool.events(), vec!["before"]);
    }

    #[tokio::test]
    async fn test_insert_then_select_round_trip() {
        let pool = MockPool::new();
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));
        let original = student(42, 19);

        db.insert(&original).await.unwrap();
        let found: Option<Student> = db
            .query_one(db.select().where_(Student::ID.eq(42)))
            .await
            .unwrap();
        assert_eq!(found, Some(original));

        let (sql, params) = pool.statements().pop().unwrap();
        assert_eq!(sql, "select * from students where id = ? limit ?");
        assert_eq!(params, vec![Value::I64(42), Value::I64(1)]);
    }

    #[tokio::test]
    async fn test_batch_runs_on_one_connection_and_commits() {
        let pool = MockPool::new();
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));

        let batch = vec![student(1, 20), student(2, 21), student(3, 22)];
        assert_eq!(db.insert_batch(&batch).await.unwrap(), 3);

        let events = pool.events();
        assert_eq!(events.iter().filter(|e| *e == "acquire").count(), 1);
        assert_eq!(events[1], "begin");
        assert_eq!(events[events.len() - 2], "commit");
        assert_eq!(events[events.len() - 1], "release");
        assert_eq!(pool.table("students").len(), 3);
    }

    #[tokio::test]
    async fn test_batch_failure_rolls_back_and_reraises() {
        let pool = MockPool::new();
        pool.fail_when("insert into");
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));

        let err = db
            .insert_batch(&[student(1, 20), student(2, 21)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Driver { .. }));

        let events = pool.events();
        assert!(events.iter().any(|e| e == "rollback"));
        assert!(!events.iter().any(|e| e == "commit"));
        assert_eq!(pool.released(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_never_touches_the_pool() {
        let pool = MockPool::new();
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));

        let err = db.insert_batch::<Student>(&[]).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        assert!(pool.events().is_empty());
    }

    #[tokio::test]
    async fn test_flex_id_batch_rejected_without_acknowledgement() {
        let pool = MockPool::new();
        let settings = Settings::builder()
            .default_key_strategy(KeyStrategy::FlexId)
            .build()
            .unwrap();
        let db = Database::new(pool.clone(), Arc::new(settings));

        let batch = vec![student(0, 20), student(0, 21)];
        let err = db.insert_batch(&batch).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Usage);
        assert!(pool.events().is_empty());

        let inserted = db
            .insert_batch_with(&batch, BatchOptions::default().allow_flex_id())
            .await
            .unwrap();
        assert_eq!(inserted, 2);
    }

    #[tokio::test]
    async fn test_paginate() {
        let pool = MockPool::new();
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));
        for id in 1..=5 {
            db.insert(&student(id, 20)).await.unwrap();
        }

        let page: Page<Student> = db
            .paginate(db.select().where_(Student::AGE.ge(18)), 2, 2)
            .await
            .unwrap();
        assert_eq!(page.total_row, 5);
        assert_eq!(page.total_page, 3);
        assert_eq!(page.records.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3, 4]);

        let statements = pool.statements();
        let count = &statements[statements.len() - 2];
        assert_eq!(count.0, "select count(*) from students where age >= ?");
        assert_eq!(count.1, vec![Value::I32(18)]);

        assert!(db.paginate::<Student>(db.select(), 0, 10).await.is_err());
    }

    #[tokio::test]
    async fn test_logical_delete_through_database() {
        let pool = MockPool::new();
        let settings = Settings::builder()
            .logic_delete(LogicDelete::enable("is_deleted", 0, 1))
            .build()
            .unwrap();
        let db = Database::new(pool.clone(), Arc::new(settings));

        assert_eq!(
            db.delete::<CourseRecord>(CourseRecord::VERSION.lt(3)).await.unwrap(),
            1
        );
        assert!(db.delete::<CourseRecord>(Condition::Empty).await.is_err());
        let (sql, _) = pool.statements().pop().unwrap();
        assert_eq!(sql, "update course_record set is_deleted = 1 where version < ?");
    }

    #[tokio::test]
    async fn test_update_by_id_and_delete_by_id() {
        let pool = MockPool::new();
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));
        let s = Student {
            id: 5,
            name: None,
            age: Some(30),
        };

        db.update_by_id(&s, UpdateOptions::ignore_nulls()).await.unwrap();
        db.delete_by_id(&s).await.unwrap();

        let statements = pool.statements();
        assert_eq!(
            statements[0],
            (
                "update students set age = ? where id = ?".to_string(),
                vec![Value::I32(30), Value::I64(5)]
            )
        );
        assert_eq!(
            statements[1],
            ("delete from students where id = ?".to_string(), vec![Value::I64(5)])
        );
    }

    #[tokio::test]
    async fn test_transaction_commits_on_ok() {
        let pool = MockPool::new();
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));

        let total = db
            .transaction(|tx| {
                Box::pin(async move {
                    tx.insert(&student(1, 20)).await?;
                    tx.insert(&student(2, 20)).await?;
                    let count = tx
                        .query_value(tx.select().select(crate::builder::count()).from("students"))
                        .await?;
                    Ok(count.and_then(|v| v.as_i64()).unwrap_or(0))
                })
            })
            .await
            .unwrap();

        assert_eq!(total, 2);
        let events = pool.events();
        assert_eq!(events.iter().filter(|e| *e == "acquire").count(), 1);
        assert!(events.iter().any(|e| e == "commit"));
        assert_eq!(pool.released(), 1);
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_err() {
        let pool = MockPool::new();
        let db = Database::new(pool.clone(), Arc::new(Settings::default()));

        let result: Result<()> = db
            .transaction(|tx| {
                Box::pin(async move {
                    tx.update(&student(1, 20), UpdateOptions::default(), col("id").eq(1))
                        .await?;
                    Err(Error::invalid_input("abort"))
                })
            })
            .await;

        assert!(result.is_err());
        let events = pool.events();
        assert!(events.iter().any(|e| e == "rollback"));
        assert!(!events.iter().any(|e| e == "commit"));
        assert_eq!(pool.released(), 1);
    }

    #[test]
    fn test_query_value_blocking() {
        let pool = MockPool::new();
        pool.queue_rows(vec![Row::from_pairs([("max(age)", Value::I32(44))])]);
        let db = Database::new(pool, Arc::new(Settings::default()));

        let value = tokio_test::block_on(
            db.query_value(db.select().select(crate::builder::max(Student::AGE)).from("students")),
        )
        .unwrap();
        assert_eq!(value, Some(Value::I32(44)));
    }
}
