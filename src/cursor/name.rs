//! Reading cursor names out of a function's result.

use std::error::Error as StdError;

use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

use crate::error::{Error, Result};

/// A refcursor value as returned by a function.
///
/// `String` does not accept the `refcursor` type, so this wrapper is used to
/// read it. Text types are accepted as well for functions that return names
/// as `text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursorName(String);

impl CursorName {
    /// The cursor name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<CursorName> for String {
    fn from(name: CursorName) -> Self {
        name.0
    }
}

impl<'a> FromSql<'a> for CursorName {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> core::result::Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(CursorName(std::str::from_utf8(raw)?.to_owned()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::REFCURSOR
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::UNKNOWN
        )
    }
}

/// Take the first column of every row as a cursor name, in row order.
pub(crate) fn collect_names(rows: &[Row]) -> Result<Vec<String>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| match row.try_get::<_, Option<CursorName>>(0)? {
            Some(name) => Ok(name.into_string()),
            None => Err(Error::InvalidCursorName(format!("NULL in row {i}"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_refcursor_and_text() {
        assert!(<CursorName as FromSql>::accepts(&Type::REFCURSOR));
        assert!(<CursorName as FromSql>::accepts(&Type::TEXT));
        assert!(<CursorName as FromSql>::accepts(&Type::VARCHAR));
        assert!(!<CursorName as FromSql>::accepts(&Type::INT4));
        assert!(!<CursorName as FromSql>::accepts(&Type::REFCURSOR_ARRAY));
    }

    #[test]
    fn test_from_sql() {
        let name = CursorName::from_sql(&Type::REFCURSOR, b"<unnamed portal 1>").unwrap();
        assert_eq!(name.as_str(), "<unnamed portal 1>");
        assert_eq!(String::from(name), "<unnamed portal 1>");
    }

    #[test]
    fn test_from_sql_rejects_invalid_utf8() {
        assert!(CursorName::from_sql(&Type::REFCURSOR, &[0xff, 0xfe]).is_err());
    }
}
