//! Blocking refcursor iteration over a [`postgres::Transaction`].

use fallible_iterator::FallibleIterator;
use postgres::Transaction;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::debug;

use super::name::collect_names;
use super::queue::{CursorQueue, Phase, Step};
use super::{Refcursor, RefcursorOptions, sql};
use crate::error::{Error, Result};

/// Extension trait for
/// [`postgres::Transaction`](https://docs.rs/postgres/latest/postgres/struct.Transaction.html)
/// to consume refcursors returned by a function.
pub trait TransactionExt<'t> {
    /// Call `function` and iterate the rows of every refcursor it returns.
    ///
    /// Parameters:
    /// - `function`: The function name, optionally schema-qualified.
    /// - `params`: Positional arguments bound to `$1`, `$2`, ...
    fn query_refcursors<'a>(
        &'a mut self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Refcursors<'a, 't>>;

    /// Same as [`query_refcursors`](Self::query_refcursors) with explicit fetch options.
    fn query_refcursors_with<'a>(
        &'a mut self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
        options: RefcursorOptions,
    ) -> Result<Refcursors<'a, 't>>;
}

impl<'t> TransactionExt<'t> for Transaction<'t> {
    fn query_refcursors<'a>(
        &'a mut self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Refcursors<'a, 't>> {
        self.query_refcursors_with(function, params, RefcursorOptions::default())
    }

    fn query_refcursors_with<'a>(
        &'a mut self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
        options: RefcursorOptions,
    ) -> Result<Refcursors<'a, 't>> {
        debug!(function, params = params.len(), "calling refcursor function");
        let rows = self.query(sql::call(function, params.len()).as_str(), params)?;
        let names = collect_names(&rows)?;
        debug!(function, cursors = ?names, "refcursor function returned");
        Ok(Refcursors::with_options(self, names, options))
    }
}

/// Rows of several refcursors, iterated cursor by cursor.
///
/// No `FETCH` is issued until [`next`](FallibleIterator::next) is first called.
/// A failed round-trip aborts the transaction on the server, so iteration
/// returns that error once and then ends.
///
/// # Example
///
/// ```no_run
/// use fallible_iterator::FallibleIterator;
/// use postgres::{Client, NoTls};
/// use postgres_refcursor::blocking::TransactionExt;
///
/// # fn main() -> Result<(), postgres_refcursor::Error> {
/// let mut client = Client::connect("host=localhost user=postgres", NoTls)?;
/// let mut tx = client.transaction()?;
///
/// let mut rows = tx.query_refcursors("get_report", &[&2024_i32])?;
/// while let Some(row) = rows.next()? {
///     let id: i32 = row.get("id");
///     println!("{id}");
/// }
///
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Refcursors<'a, 't> {
    tx: &'a mut Transaction<'t>,
    queue: CursorQueue<Row>,
}

impl<'a, 't> Refcursors<'a, 't> {
    /// Iterate the given cursors, which must already be open in `tx`.
    pub fn new<I, S>(tx: &'a mut Transaction<'t>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(tx, names, RefcursorOptions::default())
    }

    pub fn with_options<I, S>(
        tx: &'a mut Transaction<'t>,
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
        }
    }

    /// Fetch every row of the next cursor.
    ///
    /// Rows not yet yielded from the cursor currently being iterated are
    /// discarded.
    ///
    /// Errors:
    /// - [`Error::NoRefcursorLeft`] if all cursors have been taken
    /// - [`Error::Postgres`] if the `FETCH` fails; iteration then ends
    pub fn next_cursor(&mut self) -> Result<Refcursor> {
        let name = self.queue.take_cursor()?;
        let rows = match self.fetch_all(&name) {
            Ok(rows) => rows,
            Err(e) => {
                self.queue.failed();
                return Err(e.into());
            }
        };
        debug!(cursor = %name, rows = rows.len(), "refcursor fetched");
        Ok(Refcursor::new(name, rows))
    }

    fn fetch_all(&mut self, name: &str) -> core::result::Result<Vec<Row>, postgres::Error> {
        let rows = self.tx.query(sql::fetch_all(name).as_str(), &[])?;
        if self.queue.options().close_exhausted {
            self.tx.batch_execute(&sql::close(name))?;
        }
        Ok(rows)
    }

    /// Fetch the next cursor and convert each of its rows with `f`.
    pub fn read_next<T, F>(&mut self, f: F) -> Result<Vec<T>>
    where
        F: FnMut(Row) -> core::result::Result<T, tokio_postgres::Error>,
    {
        self.next_cursor()?.try_map(f)
    }

    /// Number of cursors not yet started.
    pub fn remaining(&self) -> usize {
        self.queue.remaining()
    }

    /// Name of the cursor whose rows are being iterated.
    pub fn current_cursor(&self) -> Option<&str> {
        self.queue.current_cursor()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.phase() == Phase::Exhausted
    }
}

impl FallibleIterator for Refcursors<'_, '_> {
    type Item = Row;
    type Error = Error;

    fn next(&mut self) -> Result<Option<Row>> {
        loop {
            let result = match self.queue.step() {
                Step::Row(row) => return Ok(Some(row)),
                Step::Fetch(statement) => self
                    .tx
                    .query(statement.as_str(), &[])
                    .map(|rows| self.queue.fetched(rows)),
                Step::Close(statement) => self.tx.batch_execute(&statement),
                Step::Done => return Ok(None),
            };
            if let Err(e) = result {
                self.queue.failed();
                return Err(e.into());
            }
        }
    }
}
