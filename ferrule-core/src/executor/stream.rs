use super::{release, Connection};
use crate::builder::Statement;
use crate::config::Settings;
use crate::entity::{Entity, TableMeta};
use crate::row::FieldHints;
use crate::{Error, Result};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Rows buffered ahead of the consumer
const STREAM_BUFFER: usize = 32;

/// Entities read lazily from one query.
///
/// A background task owns the connection and the cursor. It releases the
/// connection exactly once: when the cursor is exhausted, when a row fails,
/// or when the consumer drops the stream.
#[must_use]
pub struct RowStream<T> {
    inner: mpsc::Receiver<Result<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Entity> RowStream<T> {
    pub(crate) fn spawn<C: Connection>(
        mut conn: C,
        statement: Statement,
        settings: Arc<Settings>,
        meta: Arc<TableMeta>,
        hints: FieldHints,
        started: Instant,
    ) -> Self {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        let worker = tokio::spawn(async move {
            let mut completed = true;
            {
                let mut rows = conn.fetch(&statement.sql, &statement.params);
                while let Some(next) = rows.next().await {
                    let item = next.and_then(|row| row.decode::<T>(&meta, &hints));
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() {
                        tracing::debug!(target: "ferrule::sql", sql = %statement.sql, "row stream abandoned");
                        completed = false;
                        break;
                    }
                    if failed {
                        completed = false;
                        break;
                    }
                }
            }

            release(conn).await;

            if completed {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::debug!(target: "ferrule::sql", sql = %statement.sql, elapsed_ms, "row stream finished");
                settings
                    .audit()
                    .fire_after(&statement.sql, &statement.params, elapsed_ms);
            }
        });

        Self {
            inner: rx,
            worker: Some(worker),
        }
    }
}

impl<T> RowStream<T> {
    /// Stop reading and wait until the connection has been released
    pub async fn close(mut self) -> Result<()> {
        self.inner.close();
        while self.inner.recv().await.is_some() {}
        match self.worker.take() {
            Some(worker) => worker
                .await
                .map_err(|e| Error::driver(format!("row stream task failed: {}", e))),
            None => Ok(()),
        }
    }
}

impl<T> Unpin for RowStream<T> {}

impl<T> Stream for RowStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_recv(cx)
    }
}
