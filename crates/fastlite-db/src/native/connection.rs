//! Owned native database connection.

use std::ffi::{c_int, CStr, CString};
use std::ptr::{self, NonNull};

use fastlite_core::codes::SQLITE_OK;
use fastlite_core::options::MEMORY_DATA_SOURCE;
use fastlite_core::{CacheMode, ConnectionOptions, Error, OpenMode, Result};
use rusqlite::ffi;

use super::{errstr, sqlite3_close_v2};

/// Owns one native `sqlite3*` session.
///
/// The handle is released exactly once, either by [`ConnectionHandle::close`]
/// or on drop. After release every accessor reports a closed connection
/// instead of touching the freed pointer.
pub struct ConnectionHandle {
    db: Option<NonNull<ffi::sqlite3>>,
}

// The bundled engine is compiled in serialized threading mode, so a handle
// may move to another thread. It is not `Sync`: one user at a time.
unsafe impl Send for ConnectionHandle {}

impl ConnectionHandle {
    /// Open a file or in-memory database.
    pub fn open(options: &ConnectionOptions) -> Result<Self> {
        let (path, flags) = open_target(options);
        let c_path = CString::new(path)
            .map_err(|_| Error::invalid_operation("data source contains a NUL byte"))?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        if rc != SQLITE_OK {
            // A handle is usually allocated even when open fails.
            if !db.is_null() {
                unsafe { sqlite3_close_v2(db) };
            }
            return Err(Error::sqlite(rc, errstr(rc)));
        }

        let db = NonNull::new(db)
            .ok_or_else(|| Error::sqlite(ffi::SQLITE_NOMEM, errstr(ffi::SQLITE_NOMEM)))?;
        tracing::debug!("Opened connection to '{}'", options.data_source);
        Ok(Self { db: Some(db) })
    }

    /// Whether the handle still owns a live session.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.db.is_some()
    }

    /// The raw pointer, or [`Error::ConnectionClosed`].
    #[inline]
    pub(crate) fn raw(&self) -> Result<*mut ffi::sqlite3> {
        self.db.map(NonNull::as_ptr).ok_or(Error::ConnectionClosed)
    }

    /// The raw pointer or null after close. Native calls given null either
    /// return a misuse code or a neutral value.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut ffi::sqlite3 {
        self.db.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Opaque identity of the underlying session, stable while it is open.
    pub fn token(&self) -> usize {
        self.as_ptr() as usize
    }

    /// Release the session. Safe to call more than once.
    ///
    /// A failing native close still forfeits ownership; the code is logged
    /// and otherwise discarded.
    pub fn close(&mut self) {
        let Some(db) = self.db.take() else {
            return;
        };
        let rc = unsafe { sqlite3_close_v2(db.as_ptr()) };
        if rc != SQLITE_OK {
            tracing::warn!("sqlite3_close_v2 returned {rc}; handle released anyway");
        } else {
            tracing::debug!("Closed connection");
        }
    }

    /// The most recent error message recorded on this session.
    pub fn errmsg(&self) -> Option<String> {
        let db = self.db?;
        let msg = unsafe { ffi::sqlite3_errmsg(db.as_ptr()) };
        if msg.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned())
    }

    /// Rows changed by the last completed INSERT/UPDATE/DELETE on this session.
    #[inline]
    pub fn changes(&self) -> i64 {
        match self.db {
            Some(db) => i64::from(unsafe { ffi::sqlite3_changes(db.as_ptr()) }),
            None => 0,
        }
    }

    /// Rowid of the most recent successful INSERT on this session.
    #[inline]
    pub fn last_insert_rowid(&self) -> i64 {
        match self.db {
            Some(db) => unsafe { ffi::sqlite3_last_insert_rowid(db.as_ptr()) },
            None => 0,
        }
    }

    /// Number of prepared statements on this session not yet finalized.
    pub fn live_statement_count(&self) -> usize {
        let Some(db) = self.db else {
            return 0;
        };
        let mut count = 0;
        let mut stmt = unsafe { ffi::sqlite3_next_stmt(db.as_ptr(), ptr::null_mut()) };
        while !stmt.is_null() {
            count += 1;
            stmt = unsafe { ffi::sqlite3_next_stmt(db.as_ptr(), stmt) };
        }
        count
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Translate options into the path and flag set passed to `sqlite3_open_v2`.
fn open_target(options: &ConnectionOptions) -> (String, c_int) {
    let mut flags = match options.mode {
        OpenMode::ReadWriteCreate => ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE,
        OpenMode::ReadWrite => ffi::SQLITE_OPEN_READWRITE,
        OpenMode::ReadOnly => ffi::SQLITE_OPEN_READONLY,
        OpenMode::Memory => {
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_MEMORY
        }
    };
    flags |= ffi::SQLITE_OPEN_URI;
    match options.cache {
        CacheMode::Default => {}
        CacheMode::Private => flags |= ffi::SQLITE_OPEN_PRIVATECACHE,
        CacheMode::Shared => flags |= ffi::SQLITE_OPEN_SHAREDCACHE,
    }

    // With SQLITE_OPEN_MEMORY the name only identifies the database for
    // cache sharing.
    let path = if options.mode == OpenMode::Memory && options.data_source.is_empty() {
        MEMORY_DATA_SOURCE.to_string()
    } else {
        options.data_source.clone()
    };
    (path, flags)
}
