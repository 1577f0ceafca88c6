use std::ffi::{c_int, CStr};
use std::marker::PhantomData;
use std::slice;

use fastlite_core::ColumnType;
use rusqlite::ffi;

use crate::native::{ConnectionHandle, StatementHandle};

/// Non-owning view for reading the current row of a statement.
///
/// Columns are 0-based. Borrowed byte slices point into engine memory and
/// stay valid only until the statement is stepped, reset or finalized, which
/// the borrow on the reader enforces.
pub struct QueryReader<'a> {
    stmt: *mut ffi::sqlite3_stmt,
    db: *mut ffi::sqlite3,
    _statement: PhantomData<&'a StatementHandle>,
}

impl<'a> QueryReader<'a> {
    #[inline]
    pub(crate) fn new(statement: &'a StatementHandle, connection: &'a ConnectionHandle) -> Self {
        Self {
            stmt: statement.as_ptr(),
            db: connection.as_ptr(),
            _statement: PhantomData,
        }
    }

    #[inline]
    pub fn column_count(&self) -> c_int {
        unsafe { ffi::sqlite3_column_count(self.stmt) }
    }

    #[inline]
    pub fn column_int64(&self, index: c_int) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.stmt, index) }
    }

    #[inline]
    pub fn column_double(&self, index: c_int) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.stmt, index) }
    }

    /// Size in bytes of a blob or text value.
    #[inline]
    pub fn column_bytes(&self, index: c_int) -> c_int {
        unsafe { ffi::sqlite3_column_bytes(self.stmt, index) }
    }

    /// Blob bytes without copying. NULL reads as an empty slice.
    #[inline]
    pub fn column_blob(&self, index: c_int) -> &[u8] {
        // The pointer must be fetched before the size.
        let data = unsafe { ffi::sqlite3_column_blob(self.stmt, index) };
        let len = self.column_bytes(index);
        borrowed(data.cast(), len)
    }

    /// Text bytes without copying. NULL reads as an empty slice.
    #[inline]
    pub fn column_text(&self, index: c_int) -> &[u8] {
        let data = unsafe { ffi::sqlite3_column_text(self.stmt, index) };
        let len = self.column_bytes(index);
        borrowed(data, len)
    }

    /// Text as `&str`, or `None` for NULL or invalid UTF-8.
    pub fn column_str(&self, index: c_int) -> Option<&str> {
        if self.is_null(index) {
            return None;
        }
        std::str::from_utf8(self.column_text(index)).ok()
    }

    /// Storage class of the value in the current row.
    #[inline]
    pub fn column_type(&self, index: c_int) -> Option<ColumnType> {
        ColumnType::from_raw(unsafe { ffi::sqlite3_column_type(self.stmt, index) })
    }

    #[inline]
    pub fn is_null(&self, index: c_int) -> bool {
        self.column_type(index) == Some(ColumnType::Null)
    }

    pub fn column_name(&self, index: c_int) -> Option<&str> {
        let name = unsafe { ffi::sqlite3_column_name(self.stmt, index) };
        if name.is_null() {
            return None;
        }
        unsafe { CStr::from_ptr(name) }.to_str().ok()
    }

    /// Rows changed by the last completed statement on the owning connection.
    #[inline]
    pub fn changes(&self) -> i64 {
        if self.db.is_null() {
            return 0;
        }
        i64::from(unsafe { ffi::sqlite3_changes(self.db) })
    }

    /// Rowid of the last insert on the owning connection.
    #[inline]
    pub fn last_insert_rowid(&self) -> i64 {
        if self.db.is_null() {
            return 0;
        }
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }
}

#[inline]
fn borrowed<'r>(data: *const u8, len: c_int) -> &'r [u8] {
    match usize::try_from(len) {
        Ok(len) if !data.is_null() && len > 0 => unsafe { slice::from_raw_parts(data, len) },
        _ => &[],
    }
}

/// Compile-time row handling for [`FastQuery::raw_step_with`].
///
/// `has_row` is true when the step produced a row. Like [`BindAction`], it
/// is invoked without an instance.
///
/// [`FastQuery::raw_step_with`]: super::FastQuery::raw_step_with
/// [`BindAction`]: super::BindAction
pub trait StepReader<S, R> {
    fn read(has_row: bool, reader: &QueryReader<'_>, state: S) -> R;
}
