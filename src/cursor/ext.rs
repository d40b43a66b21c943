use tokio_postgres::Transaction;
use tokio_postgres::types::ToSql;
use tracing::debug;

use super::name::collect_names;
use super::stream::RefcursorStream;
use super::{RefcursorOptions, sql};
use crate::error::Result;

/// Extension trait for
/// [`Transaction`](https://docs.rs/tokio-postgres/latest/tokio_postgres/struct.Transaction.html)
/// to consume refcursors returned by a function.
pub trait TransactionExt {
    /// Call `function` and stream the rows of every refcursor it returns.
    ///
    /// Parameters:
    /// - `function`: The function name, optionally schema-qualified.
    /// - `params`: Positional arguments bound to `$1`, `$2`, ...
    fn query_refcursors<'a>(
        &'a self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = Result<RefcursorStream<'a>>> + Send
    where
        Self: 'a;

    /// Same as [`query_refcursors`](Self::query_refcursors) with explicit fetch options.
    fn query_refcursors_with<'a>(
        &'a self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
        options: RefcursorOptions,
    ) -> impl std::future::Future<Output = Result<RefcursorStream<'a>>> + Send
    where
        Self: 'a;
}

/// Implementation of [`TransactionExt`] for
/// [`Transaction`](https://docs.rs/tokio-postgres/latest/tokio_postgres/struct.Transaction.html)
impl<'t> TransactionExt for Transaction<'t> {
    /// Errors:
    /// - Propagates
    /// [`tokio_postgres::Error`](https://docs.rs/tokio-postgres/latest/tokio_postgres/error/struct.Error.html)
    /// if the function call fails
    /// - [`Error::InvalidCursorName`](crate::Error::InvalidCursorName) if the
    /// function returns a NULL cursor
    async fn query_refcursors<'a>(
        &'a self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<RefcursorStream<'a>>
    where
        Self: 'a,
    {
        self.query_refcursors_with(function, params, RefcursorOptions::default())
            .await
    }

    async fn query_refcursors_with<'a>(
        &'a self,
        function: &str,
        params: &[&(dyn ToSql + Sync)],
        options: RefcursorOptions,
    ) -> Result<RefcursorStream<'a>>
    where
        Self: 'a,
    {
        debug!(function, params = params.len(), "calling refcursor function");
        let statement = sql::call(function, params.len());
        let rows = self.query(statement.as_str(), params).await?;
        let names = collect_names(&rows)?;
        debug!(function, cursors = ?names, "refcursor function returned");
        Ok(RefcursorStream::with_options(self, names, options))
    }
}
