//! [`tokio-postgres`](https://docs.rs/tokio-postgres) and
//! [`postgres`](https://docs.rs/postgres) extension to consume refcursors
//! returned by database functions.
//!
//! # Example
//! ```no_run
//! use futures::StreamExt;
//! use tokio_postgres::NoTls;
//! use postgres_refcursor::{Error, TransactionExt};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Error> {
//!    let (mut client, connection) =
//!         tokio_postgres::connect("host=localhost user=postgres", NoTls).await?;
//!    tokio::spawn(connection);
//!
//!    // Refcursors only live as long as the transaction that opened them
//!    let tx = client.transaction().await?;
//!
//!    // Calls get_report($1) and collects the refcursor names it returns
//!    let mut rows = tx.query_refcursors("get_report", &[&2024_i32]).await?;
//!
//!    // Rows of the first cursor, then the second, and so on
//!    while let Some(row) = rows.next().await {
//!        let row = row?;
//!        println!("{row:?}");
//!    }
//!
//!    drop(rows);
//!    tx.commit().await?;
//!    Ok(())
//! }
//! ```
//!
//! # Queries
//! [`query_refcursors`](crate::TransactionExt::query_refcursors) calls the function with
//! ```sql
//! SELECT * FROM <function>($1, $2, ...)
//! ```
//! and reads the first column of every returned row as a cursor name.
//!
//! [`RefcursorStream`] implements
//! [`Stream`](https://docs.rs/futures/latest/futures/stream/trait.Stream.html)
//! and, when a cursor's rows are first needed, executes
//! ```sql
//! FETCH ALL FROM "<cursor>"
//! ```
//! Set [`RefcursorOptions::fetch_size`] to page with `FETCH FORWARD n` instead.
//! Cursors that are never reached are never fetched. Once every cursor is
//! drained the stream returns [`None`] on every subsequent poll.
//!
//! To take a whole cursor at a time use
//! [`next_cursor`](crate::RefcursorStream::next_cursor), which fails with
//! [`Error::NoRefcursorLeft`] once every cursor has been taken.
//!
//! The blocking flavour lives in [`blocking`] and works the same way over a
//! [`postgres::Transaction`](https://docs.rs/postgres/latest/postgres/struct.Transaction.html).
//!
//! Cursors are closed when the transaction ends; nothing here commits or
//! rolls back.
//!
//! # Vulnerabilities
//! The function name is spliced into the SQL text as given so that it can be
//! schema-qualified. It's up to the user to ensure it is not taken from
//! untrusted input. Parameters are always bound.

mod cursor;
pub mod error;

#[cfg(feature = "sync")]
pub use crate::cursor::blocking;
#[cfg(feature = "tokio")]
pub use crate::cursor::ext::TransactionExt;
#[cfg(any(feature = "sync", feature = "tokio"))]
pub use crate::cursor::name::CursorName;
#[cfg(feature = "tokio")]
pub use crate::cursor::stream::RefcursorStream;
pub use crate::cursor::{Refcursor, RefcursorOptions};
pub use crate::error::{Error, NoRefcursorLeft, Result};
