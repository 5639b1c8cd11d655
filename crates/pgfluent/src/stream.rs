//! Row-at-a-time iteration over query results.

use crate::client::RowStream;
use crate::error::{DbError, DbResult};
use crate::row::FromRow;
use futures_core::Stream;
use futures_util::StreamExt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A stream of rows decoded into `T`.
#[must_use]
pub struct FromRowStream<T> {
    inner: RowStream,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromRowStream<T> {
    pub(crate) fn new(inner: RowStream) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: FromRow> Stream for FromRowStream<T> {
    type Item = DbResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(T::from_row(&row))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T: FromRow> FromRowStream<T> {
    /// Decode the next row, or return [`DbError::NoMoreRows`] once the result
    /// set is exhausted. Callers must treat that variant as clean
    /// termination, not as a failure.
    pub async fn next_row(&mut self) -> DbResult<T> {
        match self.next().await {
            Some(item) => item,
            None => Err(DbError::NoMoreRows),
        }
    }
}
