//! SQL text issued against the transaction.

/// Quote a cursor name as an identifier.
///
/// Cursor names are case-sensitive and may contain spaces (the server names
/// unnamed portals `<unnamed portal N>`), so they are always quoted.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `FETCH ALL FROM` the cursor, or `FETCH FORWARD n` when `fetch_size` is non-zero.
pub(crate) fn fetch(name: &str, fetch_size: u32) -> String {
    match fetch_size {
        0 => fetch_all(name),
        n => format!("FETCH FORWARD {} FROM {}", n, quote_ident(name)),
    }
}

pub(crate) fn fetch_all(name: &str) -> String {
    format!("FETCH ALL FROM {}", quote_ident(name))
}

pub(crate) fn close(name: &str) -> String {
    format!("CLOSE {}", quote_ident(name))
}

/// Call a set-returning function with `arity` positional parameters.
///
/// The function name is used verbatim so it can be schema-qualified.
pub(crate) fn call(function: &str, arity: usize) -> String {
    let placeholders = (1..=arity)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT * FROM {function}({placeholders})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("c1"), r#""c1""#);
        assert_eq!(quote_ident("Mixed Case"), r#""Mixed Case""#);
        assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
        assert_eq!(
            quote_ident("<unnamed portal 3>"),
            r#""<unnamed portal 3>""#
        );
    }

    #[test]
    fn test_fetch() {
        assert_eq!(fetch("c1", 0), r#"FETCH ALL FROM "c1""#);
        assert_eq!(fetch("c1", 100), r#"FETCH FORWARD 100 FROM "c1""#);
        assert_eq!(fetch_all("c2"), r#"FETCH ALL FROM "c2""#);
    }

    #[test]
    fn test_close() {
        assert_eq!(close("c1"), r#"CLOSE "c1""#);
    }

    #[test]
    fn test_call() {
        assert_eq!(call("get_report", 0), "SELECT * FROM get_report()");
        assert_eq!(
            call("reports.get_report", 3),
            "SELECT * FROM reports.get_report($1, $2, $3)"
        );
    }
}
