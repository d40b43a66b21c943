//! Refcursor iteration over a borrowed transaction.

#[cfg(feature = "sync")]
pub mod blocking;
#[cfg(feature = "tokio")]
pub(crate) mod ext;
#[cfg(any(feature = "sync", feature = "tokio"))]
pub(crate) mod name;
#[cfg(any(feature = "sync", feature = "tokio"))]
pub(crate) mod queue;
#[cfg(any(feature = "sync", feature = "tokio"))]
pub(crate) mod sql;
#[cfg(feature = "tokio")]
pub(crate) mod stream;

use tokio_postgres::Row;

use crate::error::Result;

/// Options controlling how cursors are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefcursorOptions {
    /// Rows requested per `FETCH`. `0` fetches each cursor in one
    /// `FETCH ALL` round-trip; any other value pages with `FETCH FORWARD n`.
    ///
    /// Default: `0`
    pub fetch_size: u32,

    /// Issue `CLOSE` for each cursor once its rows are drained. Otherwise
    /// cursors stay open until the transaction ends.
    ///
    /// Default: `false`
    pub close_exhausted: bool,
}

impl RefcursorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set [`fetch_size`](Self::fetch_size). Pass 0 to fetch all rows at once.
    pub fn fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Set [`close_exhausted`](Self::close_exhausted).
    pub fn close_exhausted(mut self, close_exhausted: bool) -> Self {
        self.close_exhausted = close_exhausted;
        self
    }
}

/// All rows of one refcursor, fetched as a unit.
#[derive(Debug)]
pub struct Refcursor {
    name: String,
    rows: Vec<Row>,
}

impl Refcursor {
    #[cfg(any(feature = "sync", feature = "tokio"))]
    pub(crate) fn new(name: String, rows: Vec<Row>) -> Self {
        Self { name, rows }
    }

    /// The cursor name as returned by the function.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Convert every row with `f`, stopping at the first error.
    pub fn try_map<T, F>(self, f: F) -> Result<Vec<T>>
    where
        F: FnMut(Row) -> core::result::Result<T, tokio_postgres::Error>,
    {
        Ok(self.rows.into_iter().map(f).collect::<core::result::Result<Vec<T>, _>>()?)
    }
}

impl IntoIterator for Refcursor {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Refcursor {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default_fetches_all() {
        let options = RefcursorOptions::default();
        assert_eq!(options.fetch_size, 0);
        assert!(!options.close_exhausted);
        assert_eq!(options, RefcursorOptions::new());
    }

    #[test]
    fn test_options_builder() {
        let options = RefcursorOptions::new().fetch_size(500).close_exhausted(true);
        assert_eq!(options.fetch_size, 500);
        assert!(options.close_exhausted);
    }

    #[test]
    #[cfg(any(feature = "sync", feature = "tokio"))]
    fn test_empty_refcursor() {
        let cursor = Refcursor::new("c1".into(), Vec::new());
        assert_eq!(cursor.name(), "c1");
        assert!(cursor.is_empty());
        assert_eq!(cursor.len(), 0);
        assert!(cursor.try_map(|row| row.try_get::<_, i32>(0)).unwrap().is_empty());
    }
}
