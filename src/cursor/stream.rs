use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, ready},
};

use futures_core::Stream;
use tokio_postgres::{Row, Transaction};
use tracing::debug;

use super::queue::{CursorQueue, Phase, Step};
use super::{Refcursor, RefcursorOptions, sql};
use crate::error::{Error, Result};

type RoundTripOutput = core::result::Result<Option<Vec<Row>>, tokio_postgres::Error>;

/// In-flight `FETCH` (yields rows) or `CLOSE` (yields `None`).
type RoundTrip<'a> = Pin<Box<dyn Future<Output = RoundTripOutput> + Send + 'a>>;

/// Rows of several refcursors, streamed cursor by cursor.
///
/// Created by [`TransactionExt::query_refcursors`](crate::TransactionExt::query_refcursors)
/// or directly from cursor names with [`RefcursorStream::new`]. No `FETCH` is
/// issued until the stream is first polled.
///
/// A failed round-trip aborts the transaction on the server, so the stream
/// yields that error once and then ends.
pub struct RefcursorStream<'a> {
    tx: &'a Transaction<'a>,
    queue: CursorQueue<Row>,
    future: Option<RoundTrip<'a>>,
}

impl<'a> RefcursorStream<'a> {
    /// Stream the given cursors, which must already be open in `tx`.
    pub fn new<I, S>(tx: &'a Transaction<'a>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(tx, names, RefcursorOptions::default())
    }

    pub fn with_options<I, S>(
        tx: &'a Transaction<'a>,
        names: I,
        options: RefcursorOptions,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tx,
            queue: CursorQueue::new(names, options),
            future: None,
        }
    }

    /// Fetch every row of the next cursor.
    ///
    /// Rows not yet yielded from the cursor currently being streamed are
    /// discarded.
    ///
    /// Errors:
    /// - [`Error::NoRefcursorLeft`] if all cursors have been taken
    /// - [`Error::Postgres`] if the `FETCH` fails; the stream then ends
    pub async fn next_cursor(&mut self) -> Result<Refcursor> {
        self.future = None;
        let name = self.queue.take_cursor()?;
        let rows = match self.fetch_all(&name).await {
            Ok(rows) => rows,
            Err(e) => {
                self.queue.failed();
                return Err(e.into());
            }
        };
        debug!(cursor = %name, rows = rows.len(), "refcursor fetched");
        Ok(Refcursor::new(name, rows))
    }

    async fn fetch_all(&self, name: &str) -> core::result::Result<Vec<Row>, tokio_postgres::Error> {
        let rows = self.tx.query(sql::fetch_all(name).as_str(), &[]).await?;
        if self.queue.options().close_exhausted {
            self.tx.batch_execute(&sql::close(name)).await?;
        }
        Ok(rows)
    }

    /// Fetch the next cursor and convert each of its rows with `f`.
    pub async fn read_next<T, F>(&mut self, f: F) -> Result<Vec<T>>
    where
        F: FnMut(Row) -> core::result::Result<T, tokio_postgres::Error>,
    {
        self.next_cursor().await?.try_map(f)
    }

    /// Number of cursors not yet started.
    pub fn remaining(&self) -> usize {
        self.queue.remaining()
    }

    /// Name of the cursor whose rows are being streamed.
    pub fn current_cursor(&self) -> Option<&str> {
        self.queue.current_cursor()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.phase() == Phase::Exhausted
    }
}

impl<'a> Stream for RefcursorStream<'a> {
    type Item = Result<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(future) = this.future.as_mut() {
                let result = ready!(future.as_mut().poll(cx));
                this.future = None;
                match result {
                    Ok(Some(rows)) => this.queue.fetched(rows),
                    Ok(None) => {}
                    Err(e) => {
                        this.queue.failed();
                        return Poll::Ready(Some(Err(Error::from(e))));
                    }
                }
            }

            let tx = this.tx;
            match this.queue.step() {
                Step::Row(row) => return Poll::Ready(Some(Ok(row))),
                Step::Fetch(statement) => {
                    let future: RoundTrip<'a> = Box::pin(async move {
                        tx.query(statement.as_str(), &[]).await.map(Some)
                    });
                    this.future = Some(future);
                }
                Step::Close(statement) => {
                    let future: RoundTrip<'a> = Box::pin(async move {
                        tx.batch_execute(&statement).await.map(|()| None)
                    });
                    this.future = Some(future);
                }
                Step::Done => return Poll::Ready(None),
            }
        }
    }
}
