//! Translation of native result codes.

use std::ffi::c_int;

use fastlite_core::codes::{SQLITE_DONE, SQLITE_OK, SQLITE_ROW};
use fastlite_core::{Error, Result};

use crate::native::{errstr, ConnectionHandle};

/// Non-error outcome of a native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// A row is available for reading.
    Row,
    /// Execution finished; no more rows.
    Done,
}

/// Classify a native result code.
///
/// OK, ROW and DONE never raise. Anything else becomes [`Error::Sqlite`]
/// carrying the original code and a message taken from `conn` when it is
/// attached and open, or from the engine's static table otherwise.
#[inline]
pub fn classify(code: c_int, conn: Option<&ConnectionHandle>) -> Result<Status> {
    match code {
        SQLITE_OK => Ok(Status::Ok),
        SQLITE_ROW => Ok(Status::Row),
        SQLITE_DONE => Ok(Status::Done),
        _ => Err(error_for(code, conn)),
    }
}

/// Shorthand for callers that only care about success.
#[inline]
pub fn check(code: c_int, conn: Option<&ConnectionHandle>) -> Result<()> {
    classify(code, conn).map(|_| ())
}

#[cold]
#[inline(never)]
fn error_for(code: c_int, conn: Option<&ConnectionHandle>) -> Error {
    let message = conn
        .and_then(ConnectionHandle::errmsg)
        .unwrap_or_else(|| errstr(code));
    Error::sqlite(code, message)
}
