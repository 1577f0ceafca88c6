use std::ffi::c_int;
use std::marker::PhantomData;

use rusqlite::ffi;

use crate::native::StatementHandle;

/// Non-owning view for writing parameter values into a statement.
///
/// Slots are 1-based. Every call returns the raw native result code
/// (`0` on success) instead of raising, so hot loops can batch-check or
/// ignore the outcome.
pub struct QueryBinder<'a> {
    stmt: *mut ffi::sqlite3_stmt,
    _statement: PhantomData<&'a StatementHandle>,
}

impl<'a> QueryBinder<'a> {
    #[inline]
    pub(crate) fn new(statement: &'a StatementHandle) -> Self {
        Self {
            stmt: statement.as_ptr(),
            _statement: PhantomData,
        }
    }

    #[inline]
    pub fn bind_int64(&self, index: c_int, value: i64) -> c_int {
        unsafe { ffi::sqlite3_bind_int64(self.stmt, index, value) }
    }

    #[inline]
    pub fn bind_double(&self, index: c_int, value: f64) -> c_int {
        unsafe { ffi::sqlite3_bind_double(self.stmt, index, value) }
    }

    #[inline]
    pub fn bind_null(&self, index: c_int) -> c_int {
        unsafe { ffi::sqlite3_bind_null(self.stmt, index) }
    }

    /// Bind a blob. The engine copies the bytes before returning.
    #[inline]
    pub fn bind_blob(&self, index: c_int, value: &[u8]) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return ffi::SQLITE_TOOBIG;
        };
        unsafe {
            ffi::sqlite3_bind_blob(
                self.stmt,
                index,
                value.as_ptr().cast(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        }
    }

    /// Bind UTF-8 text. The engine copies the bytes before returning.
    #[inline]
    pub fn bind_text(&self, index: c_int, value: &str) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return ffi::SQLITE_TOOBIG;
        };
        unsafe {
            ffi::sqlite3_bind_text(
                self.stmt,
                index,
                value.as_ptr().cast(),
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        }
    }

    /// Bind a blob without copying it.
    ///
    /// # Safety
    ///
    /// The engine keeps `value`'s pointer. The bytes must stay alive and
    /// unmodified until the slot is rebound or cleared, or the statement is
    /// finalized. A reset alone does not release them.
    #[inline]
    pub unsafe fn bind_blob_static(&self, index: c_int, value: &[u8]) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return ffi::SQLITE_TOOBIG;
        };
        ffi::sqlite3_bind_blob(
            self.stmt,
            index,
            value.as_ptr().cast(),
            len,
            ffi::SQLITE_STATIC(),
        )
    }

    /// Bind UTF-8 text without copying it.
    ///
    /// # Safety
    ///
    /// Same contract as [`QueryBinder::bind_blob_static`].
    #[inline]
    pub unsafe fn bind_text_static(&self, index: c_int, value: &str) -> c_int {
        let Ok(len) = c_int::try_from(value.len()) else {
            return ffi::SQLITE_TOOBIG;
        };
        ffi::sqlite3_bind_text(
            self.stmt,
            index,
            value.as_ptr().cast(),
            len,
            ffi::SQLITE_STATIC(),
        )
    }

    /// Bind a blob of `len` zero bytes, for incremental writes.
    #[inline]
    pub fn bind_zeroblob(&self, index: c_int, len: c_int) -> c_int {
        unsafe { ffi::sqlite3_bind_zeroblob(self.stmt, index, len) }
    }

    /// Set every slot back to NULL.
    #[inline]
    pub fn clear_bindings(&self) -> c_int {
        unsafe { ffi::sqlite3_clear_bindings(self.stmt) }
    }

    /// Largest parameter index in the statement.
    #[inline]
    pub fn parameter_count(&self) -> c_int {
        unsafe { ffi::sqlite3_bind_parameter_count(self.stmt) }
    }
}

/// Compile-time bind behaviour for [`FastQuery::bind_with`].
///
/// Implemented on a (usually zero-sized) type and invoked without an
/// instance, so the call is fully specialized and captures nothing.
///
/// [`FastQuery::bind_with`]: super::FastQuery::bind_with
pub trait BindAction<T> {
    fn bind(binder: &QueryBinder<'_>, state: T);
}
