//! Transaction helpers.
//!
//! [`GenericClient`](crate::GenericClient) is implemented for
//! `tokio_postgres::Transaction`, so any builder operation can run inside a
//! transaction by passing the transaction where a client is expected. The
//! [`transaction!`] macro handles commit/rollback around a block.
//!
//! # Example
//!
//! ```ignore
//! use pgfluent::table;
//!
//! pgfluent::transaction!(&mut client, tx, {
//!     table("accounts")
//!         .where_("id", "=", 1i64)
//!         .decrement("balance", 100, &tx)
//!         .await?;
//!     table("accounts")
//!         .where_("id", "=", 2i64)
//!         .increment("balance", 100, &tx)
//!         .await?;
//!     Ok(())
//! })?;
//! ```

use crate::client::{GenericClient, RowStream};
use crate::error::{DbError, DbResult};
use bytes::Bytes;
use tokio_postgres::types::ToSql;
use tokio_postgres::{CopyInSink, Row};

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`; a rollback failure is reported together with the
///   causing error.
///
/// The block must evaluate to `pgfluent::DbResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::DbError::from)?;

        let __pgfluent_tx_result = async { $body }.await;
        match __pgfluent_tx_result {
            Ok(value) => {
                $tx.commit().await.map_err($crate::DbError::from)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::DbError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

/// A transaction handle with explicit completion.
///
/// Wraps a live `tokio_postgres::Transaction`; [`commit`](TxSession::commit)
/// and [`rollback`](TxSession::rollback) consume the resource, and any
/// operation issued once it is gone fails with
/// [`DbError::NoTransaction`]. Dropping the session without completing it
/// lets the driver roll the transaction back.
pub struct TxSession<'a> {
    inner: Option<tokio_postgres::Transaction<'a>>,
}

impl<'a> TxSession<'a> {
    /// Begin a transaction on the given client.
    pub async fn begin(client: &'a mut tokio_postgres::Client) -> DbResult<TxSession<'a>> {
        let inner = client.transaction().await?;
        Ok(Self { inner: Some(inner) })
    }

    fn live(&self) -> DbResult<&tokio_postgres::Transaction<'a>> {
        self.inner.as_ref().ok_or(DbError::NoTransaction)
    }

    /// Commit the transaction.
    pub async fn commit(mut self) -> DbResult<()> {
        match self.inner.take() {
            Some(tx) => tx.commit().await.map_err(DbError::from),
            None => Err(DbError::NoTransaction),
        }
    }

    /// Roll the transaction back.
    pub async fn rollback(mut self) -> DbResult<()> {
        match self.inner.take() {
            Some(tx) => tx.rollback().await.map_err(DbError::from),
            None => Err(DbError::NoTransaction),
        }
    }
}

impl Drop for TxSession<'_> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            // tokio_postgres rolls back a transaction dropped without commit.
            tracing::warn!("transaction dropped without explicit commit or rollback");
        }
    }
}

impl GenericClient for TxSession<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        GenericClient::query(self.live()?, sql, params).await
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Row> {
        GenericClient::query_one(self.live()?, sql, params).await
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<Option<Row>> {
        GenericClient::query_opt(self.live()?, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        GenericClient::execute(self.live()?, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        GenericClient::batch_execute(self.live()?, sql).await
    }

    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> DbResult<RowStream> {
        GenericClient::query_stream(self.live()?, sql, params).await
    }

    async fn copy_in(&self, sql: &str) -> DbResult<CopyInSink<Bytes>> {
        GenericClient::copy_in(self.live()?, sql).await
    }
}
