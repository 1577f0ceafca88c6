//! Owned native prepared statement.

use std::ffi::{c_int, c_uint, CStr, CString};
use std::ptr::{self, NonNull};

use fastlite_core::codes::SQLITE_OK;
use fastlite_core::{Error, Result};
use rusqlite::ffi;

use super::ConnectionHandle;

/// `SQLITE_PREPARE_PERSISTENT`: the statement will be reused many times.
const PREPARE_PERSISTENT: c_uint = 0x01;

/// Outcome of one native prepare call.
pub struct Prepared<'s> {
    /// Raw native result code.
    pub code: c_int,
    /// The compiled statement. `None` with [`SQLITE_OK`] means the consumed
    /// chunk held only whitespace or a comment.
    pub statement: Option<StatementHandle>,
    /// SQL text after the consumed chunk.
    pub tail: &'s str,
}

/// Owns one native `sqlite3_stmt*` compiled against a single connection.
///
/// Finalized exactly once, either by [`StatementHandle::finalize`] or on drop.
/// Closing the connection first is allowed: the native session stays alive
/// until its last statement is finalized.
pub struct StatementHandle {
    stmt: Option<NonNull<ffi::sqlite3_stmt>>,
}

// Moves with its connection; never shared.
unsafe impl Send for StatementHandle {}

impl StatementHandle {
    /// Compile the first statement of `sql`.
    ///
    /// Native failures are reported through [`Prepared::code`] so the caller
    /// can apply busy/retry before translating. A closed connection, an
    /// oversized text or a NUL byte in the text is an immediate error; the
    /// engine would stop reading at the NUL and drop the rest silently.
    pub fn prepare<'s>(
        conn: &ConnectionHandle,
        sql: &'s str,
        persistent: bool,
    ) -> Result<Prepared<'s>> {
        let db = conn.raw()?;
        if sql.as_bytes().contains(&0) {
            return Err(Error::invalid_operation("SQL text contains a NUL byte"));
        }
        let len = c_int::try_from(sql.len())
            .map_err(|_| Error::invalid_operation("SQL text is too long"))?;
        let flags = if persistent { PREPARE_PERSISTENT } else { 0 };

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let mut tail: *const std::ffi::c_char = ptr::null();
        let code = unsafe {
            ffi::sqlite3_prepare_v3(db, sql.as_ptr().cast(), len, flags, &mut stmt, &mut tail)
        };

        let rest = if tail.is_null() {
            ""
        } else {
            let consumed = tail as usize - sql.as_ptr() as usize;
            sql.get(consumed..).unwrap_or("")
        };

        Ok(Prepared {
            code,
            statement: NonNull::new(stmt).map(|stmt| StatementHandle { stmt: Some(stmt) }),
            tail: rest,
        })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.stmt.is_some()
    }

    /// The raw pointer or null after finalize. Native calls given null return
    /// `SQLITE_MISUSE` or a neutral value.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.stmt.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Advance execution by one row. Returns the raw native code.
    #[inline]
    pub fn step(&self) -> c_int {
        if self.stmt.is_none() {
            return ffi::SQLITE_MISUSE;
        }
        unsafe { ffi::sqlite3_step(self.as_ptr()) }
    }

    /// Rewind for another execution. Bound values are kept.
    #[inline]
    pub fn reset(&self) -> c_int {
        unsafe { ffi::sqlite3_reset(self.as_ptr()) }
    }

    /// Set every parameter slot back to NULL.
    #[inline]
    pub fn clear_bindings(&self) -> c_int {
        unsafe { ffi::sqlite3_clear_bindings(self.as_ptr()) }
    }

    /// Largest parameter index in the statement.
    pub fn parameter_count(&self) -> c_int {
        unsafe { ffi::sqlite3_bind_parameter_count(self.as_ptr()) }
    }

    /// Name of the 1-based parameter slot, prefix included (`@x`, `:x`, `$x`).
    pub fn parameter_name(&self, index: c_int) -> Option<String> {
        let name = unsafe { ffi::sqlite3_bind_parameter_name(self.as_ptr(), index) };
        if name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }

    /// 1-based slot for a parameter name, prefix included.
    pub fn parameter_index(&self, name: &str) -> Option<c_int> {
        let name = CString::new(name).ok()?;
        let index = unsafe { ffi::sqlite3_bind_parameter_index(self.as_ptr(), name.as_ptr()) };
        (index > 0).then_some(index)
    }

    /// Whether the statement makes no direct changes to the database file.
    pub fn is_readonly(&self) -> bool {
        unsafe { ffi::sqlite3_stmt_readonly(self.as_ptr()) != 0 }
    }

    pub fn column_count(&self) -> c_int {
        unsafe { ffi::sqlite3_column_count(self.as_ptr()) }
    }

    /// Release the statement. Safe to call more than once.
    ///
    /// `sqlite3_finalize` repeats the last step error; that code says nothing
    /// about the release itself and is discarded.
    pub fn finalize(&mut self) {
        if let Some(stmt) = self.stmt.take() {
            let rc = unsafe { ffi::sqlite3_finalize(stmt.as_ptr()) };
            if rc != SQLITE_OK {
                tracing::trace!("sqlite3_finalize returned {rc}; statement released anyway");
            }
        }
    }
}

impl Drop for StatementHandle {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl std::fmt::Debug for StatementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementHandle")
            .field("valid", &self.is_valid())
            .finish()
    }
}
