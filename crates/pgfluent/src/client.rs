//! Generic client trait for unified database access.

use crate::error::{DbError, DbResult};
use bytes::Bytes;
use futures_core::Stream;
use futures_util::TryStreamExt;
use std::pin::Pin;
use tokio_postgres::types::ToSql;
use tokio_postgres::{CopyInSink, Row};

/// A stream of result rows.
pub type RowStream = Pin<Box<dyn Stream<Item = DbResult<Row>> + Send>>;

/// Adapt a parameter slice to the iterator form `query_raw` expects.
pub fn slice_iter<'a>(
    s: &'a [&'a (dyn ToSql + Sync)],
) -> impl ExactSizeIterator<Item = &'a dyn ToSql> + 'a {
    s.iter().map(|s| *s as _)
}

/// A trait that unifies database clients and transactions.
///
/// Every terminal builder operation takes `&impl GenericClient`, so the same
/// statement runs against a plain connection or inside a transaction without
/// any change to the rendering path.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<Vec<Row>>> + Send;

    /// Execute a query and return the first row.
    ///
    /// Returns [`DbError::NotFound`] carrying the query text if no rows are
    /// returned.
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<Row>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<Option<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send;

    /// Execute a sequence of statements separated by semicolons.
    ///
    /// Uses the simple query protocol; no parameters, no rows.
    fn batch_execute(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = DbResult<()>> + Send;

    /// Execute a query and return rows as a stream.
    fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<RowStream>> + Send;

    /// Open a COPY ... FROM STDIN sink, the bulk-load path used by batch
    /// insert. Rows written to the sink are committed by `finish()`; dropping
    /// the sink aborts the whole batch.
    fn copy_in(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = DbResult<CopyInSink<Bytes>>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        tracing::debug!(sql, "query");
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(DbError::from)
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Row> {
        tracing::debug!(sql, "query one");
        tokio_postgres::Client::query_opt(self, sql, params)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DbError::not_found(sql))
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Option<Row>> {
        tracing::debug!(sql, "query opt");
        tokio_postgres::Client::query_opt(self, sql, params)
            .await
            .map_err(DbError::from)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        tracing::debug!(sql, "execute");
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map_err(DbError::from)
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        tracing::debug!(sql, "batch execute");
        tokio_postgres::Client::batch_execute(self, sql)
            .await
            .map_err(DbError::from)
    }

    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        tracing::debug!(sql, "query stream");
        let stream = tokio_postgres::Client::query_raw(self, sql, slice_iter(params)).await?;
        Ok(Box::pin(stream.map_err(DbError::from)))
    }

    async fn copy_in(&self, sql: &str) -> DbResult<CopyInSink<Bytes>> {
        tracing::debug!(sql, "copy in");
        tokio_postgres::Client::copy_in(self, sql)
            .await
            .map_err(DbError::from)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        tracing::debug!(sql, "query (tx)");
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(DbError::from)
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Row> {
        tracing::debug!(sql, "query one (tx)");
        tokio_postgres::Transaction::query_opt(self, sql, params)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DbError::not_found(sql))
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Option<Row>> {
        tracing::debug!(sql, "query opt (tx)");
        tokio_postgres::Transaction::query_opt(self, sql, params)
            .await
            .map_err(DbError::from)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        tracing::debug!(sql, "execute (tx)");
        tokio_postgres::Transaction::execute(self, sql, params)
            .await
            .map_err(DbError::from)
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        tracing::debug!(sql, "batch execute (tx)");
        tokio_postgres::Transaction::batch_execute(self, sql)
            .await
            .map_err(DbError::from)
    }

    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        tracing::debug!(sql, "query stream (tx)");
        let stream =
            tokio_postgres::Transaction::query_raw(self, sql, slice_iter(params)).await?;
        Ok(Box::pin(stream.map_err(DbError::from)))
    }

    async fn copy_in(&self, sql: &str) -> DbResult<CopyInSink<Bytes>> {
        tracing::debug!(sql, "copy in (tx)");
        tokio_postgres::Transaction::copy_in(self, sql)
            .await
            .map_err(DbError::from)
    }
}

/// Connect to a PostgreSQL server and spawn the connection task.
///
/// # Example
/// ```ignore
/// let client = pgfluent::connect("postgres://postgres@localhost/app").await?;
/// ```
pub async fn connect(conn_str: &str) -> DbResult<tokio_postgres::Client> {
    let (client, connection) = tokio_postgres::connect(conn_str, tokio_postgres::NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "database connection closed");
        }
    });
    Ok(client)
}
