use std::env;

use futures::StreamExt;
use postgres_refcursor::{Error, RefcursorOptions, RefcursorStream, TransactionExt};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Transaction};

const REPORT_FUNCTION: &str = r#"
CREATE FUNCTION pg_temp.get_report(first_id int) RETURNS SETOF refcursor
LANGUAGE plpgsql AS $$
DECLARE
    c1 refcursor := 'c1';
    c2 refcursor := 'c2';
BEGIN
    OPEN c1 FOR SELECT first_id AS id;
    RETURN NEXT c1;
    OPEN c2 FOR SELECT generate_series(first_id + 1, first_id + 2) AS id;
    RETURN NEXT c2;
END
$$;

CREATE FUNCTION pg_temp.get_nothing() RETURNS SETOF refcursor
LANGUAGE plpgsql AS $$
BEGIN
    RETURN;
END
$$;

CREATE FUNCTION pg_temp.get_null() RETURNS SETOF refcursor
LANGUAGE sql AS $$
    SELECT NULL::refcursor
$$;
"#;

async fn connect() -> Client {
    let url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "host=localhost user=postgres".to_string());
    let (client, connection) = tokio_postgres::connect(&url, NoTls).await.unwrap();

    tokio::spawn(async move {
        connection.await.unwrap();
    });

    client
}

async fn setup(tx: &Transaction<'_>) {
    tx.batch_execute(REPORT_FUNCTION).await.unwrap();
}

async fn collect_ids(stream: &mut RefcursorStream<'_>) -> Vec<i32> {
    let mut ids = Vec::new();
    while let Some(result) = stream.next().await {
        match result {
            Ok(row) => ids.push(row.get("id")),
            Err(e) => panic!("Error fetching rows: {}", e),
        }
    }
    ids
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server at DATABASE_URL"]
async fn test_refcursor_stream() {
    let mut client = connect().await;
    let tx = client.transaction().await.unwrap();
    setup(&tx).await;

    let mut stream = tx
        .query_refcursors("pg_temp.get_report", &[&1_i32])
        .await
        .unwrap();
    assert_eq!(stream.remaining(), 2);

    assert_eq!(collect_ids(&mut stream).await, vec![1, 2, 3]);
    assert!(stream.is_exhausted());

    // Exhausted is terminal.
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());

    drop(stream);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server at DATABASE_URL"]
async fn test_no_refcursors() {
    let mut client = connect().await;
    let tx = client.transaction().await.unwrap();
    setup(&tx).await;

    let mut stream = tx.query_refcursors("pg_temp.get_nothing", &[]).await.unwrap();
    assert_eq!(stream.remaining(), 0);
    assert!(collect_ids(&mut stream).await.is_empty());

    let err = stream.next_cursor().await.unwrap_err();
    assert!(err.is_no_refcursor_left());

    drop(stream);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server at DATABASE_URL"]
async fn test_next_cursor() {
    let mut client = connect().await;
    let tx = client.transaction().await.unwrap();
    setup(&tx).await;

    let mut stream = tx
        .query_refcursors("pg_temp.get_report", &[&10_i32])
        .await
        .unwrap();

    let first = stream.next_cursor().await.unwrap();
    assert_eq!(first.name(), "c1");
    assert_eq!(first.len(), 1);
    assert!(!stream.is_exhausted());

    let second: Vec<i32> = stream.read_next(|row| row.try_get("id")).await.unwrap();
    assert_eq!(second, vec![11, 12]);
    assert!(stream.is_exhausted());

    match stream.next_cursor().await {
        Err(Error::NoRefcursorLeft(_)) => {}
        other => panic!("expected NoRefcursorLeft, got {other:?}"),
    }

    drop(stream);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server at DATABASE_URL"]
async fn test_paged_fetch_with_close() {
    let mut client = connect().await;
    let tx = client.transaction().await.unwrap();
    setup(&tx).await;

    let options = RefcursorOptions::new().fetch_size(1).close_exhausted(true);
    let mut stream = tx
        .query_refcursors_with("pg_temp.get_report", &[&1_i32], options)
        .await
        .unwrap();
    assert_eq!(collect_ids(&mut stream).await, vec![1, 2, 3]);
    drop(stream);

    // Both cursors were closed after being drained.
    let err = tx.query(r#"FETCH ALL FROM "c1""#, &[]).await.unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::INVALID_CURSOR_NAME));

    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server at DATABASE_URL"]
async fn test_stream_is_lazy() {
    let mut client = connect().await;
    let tx = client.transaction().await.unwrap();

    // Nothing is fetched on construction, so unknown cursors are only
    // reported on the first poll.
    let mut stream = RefcursorStream::new(&tx, ["missing_1", "missing_2", "missing_3"]);
    assert_eq!(stream.remaining(), 3);

    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(
        err.as_db_error().map(|e| e.code()),
        Some(&SqlState::INVALID_CURSOR_NAME)
    );

    drop(stream);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server at DATABASE_URL"]
async fn test_failed_fetch_ends_stream() {
    let mut client = connect().await;
    let tx = client.transaction().await.unwrap();

    // The first failure aborts the transaction; the remaining cursors are
    // not fetched, so exactly one error is reported.
    let mut stream = RefcursorStream::new(&tx, ["missing_1", "missing_2", "missing_3"]);
    let mut errors = 0;
    while let Some(result) = stream.next().await {
        assert!(result.is_err());
        errors += 1;
    }
    assert_eq!(errors, 1);
    assert!(stream.is_exhausted());
    assert_eq!(stream.remaining(), 0);
    assert!(stream.next_cursor().await.unwrap_err().is_no_refcursor_left());

    drop(stream);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL server at DATABASE_URL"]
async fn test_null_cursor_name() {
    let mut client = connect().await;
    let tx = client.transaction().await.unwrap();
    setup(&tx).await;

    match tx.query_refcursors("pg_temp.get_null", &[]).await {
        Err(Error::InvalidCursorName(_)) => {}
        Err(e) => panic!("expected InvalidCursorName, got {e:?}"),
        Ok(_) => panic!("expected InvalidCursorName, got a stream"),
    }

    tx.rollback().await.unwrap();
}
