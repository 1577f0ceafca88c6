//! Statement compilation under the busy/retry protocol.

use std::ffi::c_int;
use std::time::Instant;

use fastlite_core::{Error, Result};
use rusqlite::ffi;

use crate::native::{ConnectionHandle, Prepared, StatementHandle};
use crate::retry::RetryPolicy;
use crate::status;

/// Compile the first statement of `sql`, retrying while the schema is locked.
///
/// Returns the statement, or `None` when the consumed chunk was whitespace or
/// a comment, together with the unconsumed remainder. The deadline is
/// measured from `started` so callers can share one budget across calls.
pub fn next_statement<'s>(
    conn: &ConnectionHandle,
    sql: &'s str,
    persistent: bool,
    policy: &RetryPolicy,
    started: Instant,
) -> Result<(Option<StatementHandle>, &'s str)> {
    let mut last: Option<Prepared<'s>> = None;
    let mut failure: Option<Error> = None;

    let code: c_int = policy.run_from(started, || {
        match StatementHandle::prepare(conn, sql, persistent) {
            Ok(prepared) => {
                let code = prepared.code;
                last = Some(prepared);
                code
            }
            Err(e) => {
                failure = Some(e);
                ffi::SQLITE_MISUSE
            }
        }
    });

    if let Some(e) = failure {
        return Err(e);
    }
    status::check(code, Some(conn))?;

    match last {
        Some(prepared) => Ok((prepared.statement, prepared.tail)),
        None => Ok((None, "")),
    }
}

/// Compile every statement in `sql`, skipping empty chunks.
///
/// On failure the statements compiled so far are finalized before the error
/// is returned.
pub fn all_statements(
    conn: &ConnectionHandle,
    sql: &str,
    persistent: bool,
    policy: &RetryPolicy,
) -> Result<Vec<StatementHandle>> {
    let started = Instant::now();
    let mut statements = Vec::new();
    let mut rest = sql;

    while !rest.trim().is_empty() {
        let (statement, tail) = next_statement(conn, rest, persistent, policy, started)?;
        if let Some(statement) = statement {
            statements.push(statement);
        }
        // No progress means the engine found nothing more to compile.
        if tail.len() >= rest.len() {
            break;
        }
        rest = tail;
    }

    Ok(statements)
}

/// Compile `sql`, which must hold exactly one statement.
///
/// Anything else finalizes whatever was compiled and fails with
/// [`Error::StatementCount`].
pub fn single_statement(
    conn: &ConnectionHandle,
    sql: &str,
    policy: &RetryPolicy,
) -> Result<StatementHandle> {
    let mut statements = all_statements(conn, sql, true, policy)?;
    if statements.len() != 1 {
        let found = statements.len();
        for statement in &mut statements {
            statement.finalize();
        }
        return Err(Error::StatementCount { found });
    }
    statements
        .pop()
        .ok_or(Error::StatementCount { found: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastlite_core::ConnectionOptions;
    use std::time::Duration;

    fn open() -> ConnectionHandle {
        ConnectionHandle::open(&ConnectionOptions::memory()).unwrap()
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::prepare(Duration::from_secs(1))
    }

    #[test]
    fn test_next_statement_returns_remainder() {
        let conn = open();
        let (statement, rest) =
            next_statement(&conn, "SELECT 1; SELECT 2;", false, &policy(), Instant::now())
                .unwrap();
        assert!(statement.is_some());
        assert_eq!(rest, " SELECT 2;");
    }

    #[test]
    fn test_next_statement_raises_native_error() {
        let conn = open();
        let err = next_statement(&conn, "SELEC 1", false, &policy(), Instant::now())
            .unwrap_err();
        assert_eq!(err.native_code(), Some(ffi::SQLITE_ERROR));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_all_statements_skips_comments() {
        let conn = open();
        let statements =
            all_statements(&conn, "SELECT 1; -- note\n; SELECT 2; /* tail */", false, &policy())
                .unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(conn.live_statement_count(), 2);
    }

    #[test]
    fn test_all_statements_finalizes_on_failure() {
        let conn = open();
        let err = all_statements(&conn, "SELECT 1; SELEC 2", false, &policy()).unwrap_err();
        assert_eq!(err.native_code(), Some(ffi::SQLITE_ERROR));
        assert_eq!(conn.live_statement_count(), 0);
    }

    #[test]
    fn test_nul_in_sql_is_rejected() {
        let conn = open();
        let err = all_statements(&conn, "SELECT 1\0; SELECT 2", false, &policy()).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        let err = single_statement(&conn, "SELECT 1\0; SELECT 2", &policy()).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert_eq!(conn.live_statement_count(), 0);
    }

    #[test]
    fn test_single_statement() {
        let conn = open();
        let statement = single_statement(&conn, "SELECT 1;", &policy()).unwrap();
        assert!(statement.is_valid());
    }

    #[test]
    fn test_single_statement_rejects_two() {
        let conn = open();
        let err = single_statement(&conn, "SELECT 1; SELECT 2", &policy()).unwrap_err();
        assert!(matches!(err, Error::StatementCount { found: 2 }));
        assert_eq!(conn.live_statement_count(), 0);
    }

    #[test]
    fn test_single_statement_rejects_empty() {
        let conn = open();
        let err = single_statement(&conn, "  -- nothing", &policy()).unwrap_err();
        assert!(matches!(err, Error::StatementCount { found: 0 }));
    }
}
