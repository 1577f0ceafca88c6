//! Scoped-ownership wrappers around the two native resource kinds.
//!
//! [`ConnectionHandle`] owns a `sqlite3*`, [`StatementHandle`] owns a
//! `sqlite3_stmt*`. Both release their resource exactly once and never touch
//! it afterwards. Raw pointers do not leave this crate.

mod connection;
mod statement;

use std::ffi::{c_int, CStr};

use rusqlite::ffi;

pub use connection::ConnectionHandle;
pub use statement::{Prepared, StatementHandle};

// Left out of the generated bindings, but exported by the bundled library.
// Unlike `sqlite3_close` it never refuses: with statements still alive the
// session becomes a zombie and is freed by the last finalize.
extern "C" {
    fn sqlite3_close_v2(db: *mut ffi::sqlite3) -> c_int;
}

/// Static English description of a result code, for contexts with no
/// connection to ask.
pub fn errstr(code: c_int) -> String {
    let msg = unsafe { ffi::sqlite3_errstr(code) };
    if msg.is_null() {
        return format!("unknown error ({code})");
    }
    unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
}
