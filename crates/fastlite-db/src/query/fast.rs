use std::ffi::c_int;
use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::time::Duration;

use fastlite_core::codes::{SQLITE_DONE, SQLITE_OK, SQLITE_ROW};
use fastlite_core::Result;

use super::{BindAction, QueryBinder, QueryReader, StepReader};
use crate::connection::Connection;
use crate::native::StatementHandle;
use crate::pool::ConnectionPool;
use crate::prepare;
use crate::retry::RetryPolicy;
use crate::status::{self, Status};

/// One compiled statement over one owned connection, for repeated
/// bind/step/reset cycles.
///
/// The usual cycle is: [`bind`](Self::bind) values, [`step`](Self::step)
/// until done while reading each row, [`reset`](Self::reset), then bind again.
///
/// Dropping the query finalizes the statement and then hands the connection
/// back to its pool, or closes it when there is none.
pub struct FastQuery {
    statement: StatementHandle,
    connection: ManuallyDrop<Connection>,
    pool: Option<Arc<ConnectionPool>>,
    sql: String,
    step_policy: RetryPolicy,
}

impl FastQuery {
    /// Compile `sql` on a connection the query will own.
    ///
    /// `sql` must compile to exactly one statement; otherwise every compiled
    /// statement is finalized and [`Error::StatementCount`] is returned.
    ///
    /// [`Error::StatementCount`]: fastlite_core::Error::StatementCount
    pub fn new(sql: impl Into<String>, connection: Connection) -> Result<Self> {
        Self::build(sql.into(), connection, None)
    }

    /// Like [`FastQuery::new`], returning the connection to `pool` on drop.
    /// The connection also goes back to the pool when compilation fails.
    pub fn with_pool(
        sql: impl Into<String>,
        connection: Connection,
        pool: Arc<ConnectionPool>,
    ) -> Result<Self> {
        Self::build(sql.into(), connection, Some(pool))
    }

    fn build(sql: String, connection: Connection, pool: Option<Arc<ConnectionPool>>) -> Result<Self> {
        let compiled = prepare::single_statement(
            connection.handle(),
            &sql,
            &connection.prepare_policy(),
        );

        match compiled {
            Ok(statement) => Ok(Self {
                statement,
                step_policy: connection.step_policy(),
                connection: ManuallyDrop::new(connection),
                pool,
                sql,
            }),
            Err(e) => {
                if let Some(pool) = pool {
                    if let Err(release) = pool.release(connection) {
                        tracing::debug!("Connection not returned after failed compile: {release}");
                    }
                }
                Err(e)
            }
        }
    }

    /// Write parameter values through a closure.
    #[inline]
    pub fn bind<F, T, R>(&self, f: F, state: T) -> R
    where
        F: FnOnce(&QueryBinder<'_>, T) -> R,
    {
        f(&QueryBinder::new(&self.statement), state)
    }

    /// Write parameter values through a [`BindAction`] type.
    #[inline]
    pub fn bind_with<A, T>(&self, state: T)
    where
        A: BindAction<T>,
    {
        A::bind(&QueryBinder::new(&self.statement), state)
    }

    /// A binder for direct use.
    #[inline]
    pub fn binder(&self) -> QueryBinder<'_> {
        QueryBinder::new(&self.statement)
    }

    /// Advance once under the busy/retry protocol and hand the outcome to
    /// `read`, whose first argument is true when a row is available.
    ///
    /// Any code other than OK, ROW or DONE, including contention still
    /// pending at the deadline, is returned as an error and `read` is not
    /// called.
    #[inline]
    pub fn step<F, S, R>(&mut self, read: F, state: S) -> Result<R>
    where
        F: FnOnce(bool, &QueryReader<'_>, S) -> R,
    {
        let statement = &self.statement;
        let code = self.step_policy.run(|| statement.step());
        let has_row = status::classify(code, Some(self.connection.handle()))? == Status::Row;
        Ok(read(has_row, &self.reader(), state))
    }

    /// Advance once with no retry and no error translation.
    ///
    /// `read` is only called for OK, ROW and DONE; the raw code is always
    /// returned so the caller can choose its own policy.
    #[inline]
    pub fn raw_step<F, S, R>(&mut self, read: F, state: S) -> (c_int, Option<R>)
    where
        F: FnOnce(bool, &QueryReader<'_>, S) -> R,
    {
        let code = self.statement.step();
        match code {
            SQLITE_OK | SQLITE_ROW | SQLITE_DONE => {
                let result = read(code == SQLITE_ROW, &self.reader(), state);
                (code, Some(result))
            }
            _ => (code, None),
        }
    }

    /// [`FastQuery::raw_step`] with a [`StepReader`] type.
    #[inline]
    pub fn raw_step_with<Rd, S, R>(&mut self, state: S) -> (c_int, Option<R>)
    where
        Rd: StepReader<S, R>,
    {
        self.raw_step(|has_row, reader, state| Rd::read(has_row, reader, state), state)
    }

    /// Rewind for another execution.
    ///
    /// Bound values are NOT cleared: stepping again without rebinding reuses
    /// them. Use [`FastQuery::clear_and_reset`] to drop them as well.
    #[inline]
    pub fn reset(&mut self) -> c_int {
        self.statement.reset()
    }

    /// Set every parameter back to NULL and rewind.
    pub fn clear_and_reset(&mut self) -> c_int {
        let cleared = self.statement.clear_bindings();
        let reset = self.statement.reset();
        if cleared != SQLITE_OK {
            cleared
        } else {
            reset
        }
    }

    pub fn is_readonly(&self) -> bool {
        self.statement.is_readonly()
    }

    pub fn parameter_count(&self) -> c_int {
        self.statement.parameter_count()
    }

    /// 1-based slot for a named parameter, prefix included.
    pub fn parameter_index(&self, name: &str) -> Option<c_int> {
        self.statement.parameter_index(name)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_policy.timeout()
    }

    pub fn set_step_timeout(&mut self, timeout: Duration) {
        self.step_policy = RetryPolicy::step(timeout);
    }

    #[inline]
    fn reader(&self) -> QueryReader<'_> {
        QueryReader::new(&self.statement, self.connection.handle())
    }
}

impl Drop for FastQuery {
    fn drop(&mut self) {
        self.statement.finalize();
        // SAFETY: `connection` is never touched again after this point.
        let connection = unsafe { ManuallyDrop::take(&mut self.connection) };
        match self.pool.take() {
            Some(pool) => {
                if let Err(e) = pool.release(connection) {
                    tracing::debug!("Connection closed instead of returned: {e}");
                }
            }
            None => drop(connection),
        }
    }
}

impl std::fmt::Debug for FastQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastQuery")
            .field("sql", &self.sql)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastlite_core::{ColumnType, ConnectionOptions, Error};

    fn memory() -> Connection {
        Connection::open(&ConnectionOptions::memory()).unwrap()
    }

    fn with_table() -> Connection {
        let conn = memory();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER, b BLOB, s TEXT)")
            .unwrap();
        conn
    }

    #[test]
    fn test_single_statement_only() {
        assert!(FastQuery::new("SELECT 1;", memory()).is_ok());
        let err = FastQuery::new("SELECT 1; SELECT 2", memory()).unwrap_err();
        assert!(matches!(err, Error::StatementCount { found: 2 }));
    }

    #[test]
    fn test_step_reads_row_then_done() {
        let mut query = FastQuery::new("SELECT ?1 + 1", memory()).unwrap();
        assert_eq!(query.bind(|b, v| b.bind_int64(1, v), 41), SQLITE_OK);

        let first = query
            .step(|has_row, r, _| has_row.then(|| r.column_int64(0)), ())
            .unwrap();
        assert_eq!(first, Some(42));

        let second = query.step(|has_row, _, _| has_row, ()).unwrap();
        assert!(!second);
    }

    #[test]
    fn test_step_raises_native_error() {
        let conn = memory();
        conn.execute_batch("CREATE TABLE u (x INTEGER UNIQUE); INSERT INTO u VALUES (1)")
            .unwrap();
        let mut query = FastQuery::new("INSERT INTO u VALUES (1)", conn).unwrap();
        let err = query.step(|_, _, _| (), ()).unwrap_err();
        assert_eq!(err.native_code().map(|c| c & 0xff), Some(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(err.to_string().contains("UNIQUE constraint failed"));
    }

    #[test]
    fn test_raw_step_returns_code() {
        let conn = memory();
        conn.execute_batch("CREATE TABLE u (x INTEGER UNIQUE); INSERT INTO u VALUES (1)")
            .unwrap();
        let mut query = FastQuery::new("INSERT INTO u VALUES (?1)", conn).unwrap();

        query.binder().bind_int64(1, 2);
        let (code, changes) = query.raw_step(|_, r, _| r.changes(), ());
        assert_eq!(code, SQLITE_DONE);
        assert_eq!(changes, Some(1));

        query.reset();
        let (code, result) = query.raw_step(|_, _, _| "called", ());
        assert_eq!(code & 0xff, rusqlite::ffi::SQLITE_CONSTRAINT);
        assert_eq!(result, None);
    }

    fn first_column(has_row: bool, r: &QueryReader<'_>, _: ()) -> Option<i64> {
        has_row.then(|| r.column_int64(0))
    }

    #[test]
    fn test_reset_keeps_bindings() {
        let mut query = FastQuery::new("SELECT ?1", memory()).unwrap();
        query.binder().bind_int64(1, 7);
        let read = first_column;

        assert_eq!(query.step(read, ()).unwrap(), Some(7));
        assert_eq!(query.step(read, ()).unwrap(), None);
        query.reset();
        assert_eq!(query.step(read, ()).unwrap(), Some(7));

        query.clear_and_reset();
        let cleared = query
            .step(|_, r, _| r.column_type(0), ())
            .unwrap();
        assert_eq!(cleared, Some(ColumnType::Null));
    }

    #[test]
    fn test_blob_and_text_columns() {
        let mut insert =
            FastQuery::new("INSERT INTO t (b, s) VALUES (?1, ?2)", with_table()).unwrap();
        let blob = [0u8, 1, 2, 255];
        let codes = insert.bind(
            |b, text| (b.bind_blob(1, &blob), b.bind_text(2, text)),
            "héllo",
        );
        assert_eq!(codes, (SQLITE_OK, SQLITE_OK));
        let rowid = insert.step(|_, r, _| r.last_insert_rowid(), ()).unwrap();
        assert_eq!(rowid, 1);
        assert_eq!(insert.connection().changes(), 1);
        assert!(!insert.is_readonly());
    }

    #[test]
    fn test_static_binds_read_back() {
        let blob = vec![9u8; 64];
        let text = String::from("borrowed");
        let mut insert =
            FastQuery::new("INSERT INTO t (b, s) VALUES (?1, ?2)", with_table()).unwrap();

        // Both buffers outlive the statement.
        let codes = unsafe {
            let binder = insert.binder();
            (binder.bind_blob_static(1, &blob), binder.bind_text_static(2, &text))
        };
        assert_eq!(codes, (SQLITE_OK, SQLITE_OK));
        insert.step(|_, _, _| (), ()).unwrap();
        insert.reset();
        insert.step(|_, _, _| (), ()).unwrap();
        insert.clear_and_reset();

        let conn = insert.connection();
        assert_eq!(
            conn.query_scalar_i64("SELECT count(*) FROM t WHERE s = 'borrowed'").unwrap(),
            Some(2)
        );
        assert_eq!(
            conn.query_scalar_text("SELECT hex(b) FROM t WHERE id = 2").unwrap(),
            Some("09".repeat(64))
        );
    }

    #[test]
    fn test_reader_columns() {
        let conn = with_table();
        conn.execute_batch("INSERT INTO t (v, b, s) VALUES (1, x'00ff', 'abc'), (NULL, NULL, NULL)")
            .unwrap();
        let mut query = FastQuery::new("SELECT v, b, s FROM t ORDER BY id", conn).unwrap();
        assert!(query.is_readonly());

        let first = query
            .step(
                |_, r, _| {
                    (
                        r.column_count(),
                        r.column_name(1).map(str::to_owned),
                        r.column_blob(1).to_vec(),
                        r.column_bytes(1),
                        r.column_str(2).map(str::to_owned),
                        r.column_type(0),
                    )
                },
                (),
            )
            .unwrap();
        assert_eq!(first.0, 3);
        assert_eq!(first.1.as_deref(), Some("b"));
        assert_eq!(first.2, vec![0x00, 0xff]);
        assert_eq!(first.3, 2);
        assert_eq!(first.4.as_deref(), Some("abc"));
        assert_eq!(first.5, Some(ColumnType::Integer));

        let second = query
            .step(
                |_, r, _| (r.is_null(0), r.column_blob(1).is_empty(), r.column_str(2).is_none()),
                (),
            )
            .unwrap();
        assert_eq!(second, (true, true, true));
    }

    struct BindPair;

    impl BindAction<(i64, f64)> for BindPair {
        fn bind(binder: &QueryBinder<'_>, (a, b): (i64, f64)) {
            binder.bind_int64(1, a);
            binder.bind_double(2, b);
        }
    }

    struct ReadPair;

    impl StepReader<(), (i64, f64)> for ReadPair {
        fn read(_has_row: bool, reader: &QueryReader<'_>, _: ()) -> (i64, f64) {
            (reader.column_int64(0), reader.column_double(1))
        }
    }

    #[test]
    fn test_typed_bind_and_read() {
        let mut query = FastQuery::new("SELECT ?1, ?2", memory()).unwrap();
        query.bind_with::<BindPair, (i64, f64)>((3, 0.5));
        let (code, pair) = query.raw_step_with::<ReadPair, (), (i64, f64)>(());
        assert_eq!(code, SQLITE_ROW);
        assert_eq!(pair, Some((3, 0.5)));
    }

    #[test]
    fn test_parameter_inspection() {
        let query = FastQuery::new("SELECT @a, @b", memory()).unwrap();
        assert_eq!(query.parameter_count(), 2);
        assert_eq!(query.parameter_index("@b"), Some(2));
        assert_eq!(query.sql(), "SELECT @a, @b");
    }

    #[test]
    fn test_bind_out_of_range_returns_code() {
        let query = FastQuery::new("SELECT ?1", memory()).unwrap();
        assert_eq!(query.binder().bind_null(5), rusqlite::ffi::SQLITE_RANGE);
    }
}
