//! Integration tests for the fast query path.

mod common;

use common::TestDb;
use fastlite::core::codes::{SQLITE_DONE, SQLITE_OK, SQLITE_ROW};
use fastlite::{BindAction, Error, FastQuery, QueryBinder, QueryReader, StepReader};

fn first_i64(has_row: bool, row: &QueryReader<'_>, _: ()) -> Option<i64> {
    has_row.then(|| row.column_int64(0))
}

#[test]
fn test_single_statement_succeeds() {
    let db = TestDb::new();
    let pool = db.pool();
    let mut query = pool.fast_query("SELECT 1;").unwrap();
    assert_eq!(query.step(first_i64, ()).unwrap(), Some(1));
}

#[test]
fn test_two_statements_fail_without_leaking() {
    let db = TestDb::new();
    let pool = db.pool_builder().capacity(1).build().unwrap();
    let pool = std::sync::Arc::new(pool);

    let err = pool.fast_query("SELECT 1; SELECT 2;").unwrap_err();
    assert!(matches!(err, Error::StatementCount { found: 2 }));
    assert_eq!(err.category(), fastlite::ErrorCategory::Misuse);

    // The same physical connection went back to the pool.
    assert_eq!(pool.idle_count(), 1);
    let conn = pool.rent().unwrap();
    assert_eq!(conn.live_statement_count(), 0);
    pool.release(conn).unwrap();
}

#[test]
fn test_integer_round_trip() {
    let db = TestDb::new();
    let pool = db.pool();
    let mut query = pool.fast_query("SELECT ?1").unwrap();

    for value in [0, -1, 1, i64::MIN, i64::MAX, (1 << 53) + 1] {
        assert_eq!(query.binder().bind_int64(1, value), SQLITE_OK);
        let read = query.step(first_i64, ()).unwrap();
        assert_eq!(read, Some(value));
        query.reset();
    }
}

#[test]
fn test_double_round_trip() {
    let db = TestDb::new();
    let pool = db.pool();
    let mut query = pool.fast_query("SELECT ?1").unwrap();

    for value in [0.0, -1.5, f64::MIN_POSITIVE, f64::MAX, f64::MIN, std::f64::consts::PI] {
        query.binder().bind_double(1, value);
        let read = query.step(|_, row, _| row.column_double(0), ()).unwrap();
        assert_eq!(read.to_bits(), value.to_bits());
        query.reset();
    }
}

#[test]
fn test_reset_does_not_clear_bindings() {
    let db = TestDb::new().with_table();
    let pool = db.pool();
    let mut insert = pool.fast_query("INSERT INTO kv (v) VALUES (?1)").unwrap();

    insert.binder().bind_int64(1, 99);
    assert!(!insert.step(|has_row, _, _| has_row, ()).unwrap());
    insert.reset();
    // No rebinding: the second execution sees the same value.
    assert!(!insert.step(|has_row, _, _| has_row, ()).unwrap());
    insert.reset();

    let mut check = pool.fast_query("SELECT count(*) FROM kv WHERE v = 99").unwrap();
    assert_eq!(check.step(first_i64, ()).unwrap(), Some(2));
}

#[test]
fn test_changes_and_rowid_from_reader() {
    let db = TestDb::new().with_table();
    let pool = db.pool();
    let mut insert = pool.fast_query("INSERT INTO kv (k, v) VALUES (?1, ?2)").unwrap();

    insert.bind(
        |b, (k, v)| {
            b.bind_int64(1, k);
            b.bind_text(2, v);
        },
        (42i64, "answer"),
    );
    let (changes, rowid) = insert
        .step(|_, row, _| (row.changes(), row.last_insert_rowid()), ())
        .unwrap();
    assert_eq!((changes, rowid), (1, 42));
}

#[test]
fn test_blob_read_without_copy() {
    let db = TestDb::new().with_table();
    let pool = db.pool();
    let payload: Vec<u8> = (0..=255).collect();

    {
        let mut insert = pool.fast_query("INSERT INTO kv (v) VALUES (?1)").unwrap();
        assert_eq!(insert.binder().bind_blob(1, &payload), SQLITE_OK);
        insert.step(|_, _, _| (), ()).unwrap();
    }

    let mut select = pool.fast_query("SELECT v FROM kv").unwrap();
    let matches = select
        .step(|has_row, row, _| has_row && row.column_blob(0) == payload.as_slice(), ())
        .unwrap();
    assert!(matches);
}

#[test]
fn test_native_error_is_raised_with_code() {
    let db = TestDb::new().with_table();
    let pool = db.pool();
    let mut insert = pool.fast_query("INSERT INTO kv (k, v) VALUES (1, 1)").unwrap();
    insert.step(|_, _, _| (), ()).unwrap();
    insert.reset();

    let err = insert.step(|_, _, _| (), ()).unwrap_err();
    assert_eq!(err.native_code().map(|c| c & 0xff), Some(19));
    assert_eq!(err.category(), fastlite::ErrorCategory::Native);
    assert!(err.to_string().starts_with("SQLite Error 19: '"));
}

struct BindKv;

impl BindAction<(i64, i64)> for BindKv {
    fn bind(binder: &QueryBinder<'_>, (k, v): (i64, i64)) {
        binder.bind_int64(1, k);
        binder.bind_int64(2, v);
    }
}

struct SumRow;

impl StepReader<i64, i64> for SumRow {
    fn read(has_row: bool, reader: &QueryReader<'_>, offset: i64) -> i64 {
        if has_row {
            reader.column_int64(0) + offset
        } else {
            offset
        }
    }
}

#[test]
fn test_typed_bind_and_raw_step() {
    let db = TestDb::new().with_table();
    let pool = db.pool();
    {
        let mut insert = pool.fast_query("INSERT INTO kv (k, v) VALUES (?1, ?2)").unwrap();
        for k in 1..=4 {
            insert.bind_with::<BindKv, (i64, i64)>((k, k * 10));
            let (code, _) = insert.raw_step(|_, _, _| (), ());
            assert_eq!(code, SQLITE_DONE);
            insert.reset();
        }
    }

    let mut sum = pool.fast_query("SELECT sum(v) FROM kv").unwrap();
    let (code, total) = sum.raw_step_with::<SumRow, i64, i64>(1);
    assert_eq!(code, SQLITE_ROW);
    assert_eq!(total, Some(101));
}

#[test]
fn test_unpooled_query_closes_its_connection() {
    let db = TestDb::new();
    let conn = db.connect(std::time::Duration::from_secs(1));
    let mut query = FastQuery::new("SELECT 7", conn).unwrap();
    assert_eq!(query.step(first_i64, ()).unwrap(), Some(7));
    assert!(query.connection().is_open());
    drop(query);
}
