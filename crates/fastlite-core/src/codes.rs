//! Native result codes and column storage classes.
//!
//! The numeric values are fixed by the SQLite C API and never change between
//! releases, so they are spelled out here rather than pulled from the engine
//! bindings. That keeps this crate free of any native dependency.

use std::fmt;

/// Raw `SQLITE_OK`.
pub const SQLITE_OK: i32 = 0;
/// Raw `SQLITE_BUSY`.
pub const SQLITE_BUSY: i32 = 5;
/// Raw `SQLITE_LOCKED`.
pub const SQLITE_LOCKED: i32 = 6;
/// Raw `SQLITE_ROW`.
pub const SQLITE_ROW: i32 = 100;
/// Raw `SQLITE_DONE`.
pub const SQLITE_DONE: i32 = 101;
/// Raw `SQLITE_LOCKED_SHAREDCACHE` (extended code).
pub const SQLITE_LOCKED_SHAREDCACHE: i32 = SQLITE_LOCKED | (1 << 8);
/// Raw `SQLITE_BUSY_SNAPSHOT` (extended code).
pub const SQLITE_BUSY_SNAPSHOT: i32 = SQLITE_BUSY | (2 << 8);

/// Closed enumeration of the result codes surfaced by the public API.
///
/// Anything that is not success, a row, completion or a member of the
/// busy/locked family is carried verbatim in [`ResultCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    Row,
    Done,
    Busy,
    Locked,
    BusySnapshot,
    LockedSharedCache,
    Other(i32),
}

impl ResultCode {
    /// Map a raw native integer onto the enumeration.
    pub fn from_raw(code: i32) -> Self {
        match code {
            SQLITE_OK => ResultCode::Ok,
            SQLITE_ROW => ResultCode::Row,
            SQLITE_DONE => ResultCode::Done,
            SQLITE_BUSY => ResultCode::Busy,
            SQLITE_LOCKED => ResultCode::Locked,
            SQLITE_BUSY_SNAPSHOT => ResultCode::BusySnapshot,
            SQLITE_LOCKED_SHAREDCACHE => ResultCode::LockedSharedCache,
            other => ResultCode::Other(other),
        }
    }

    /// The raw native integer for this code.
    pub fn raw(self) -> i32 {
        match self {
            ResultCode::Ok => SQLITE_OK,
            ResultCode::Row => SQLITE_ROW,
            ResultCode::Done => SQLITE_DONE,
            ResultCode::Busy => SQLITE_BUSY,
            ResultCode::Locked => SQLITE_LOCKED,
            ResultCode::BusySnapshot => SQLITE_BUSY_SNAPSHOT,
            ResultCode::LockedSharedCache => SQLITE_LOCKED_SHAREDCACHE,
            ResultCode::Other(code) => code,
        }
    }

    /// Busy/locked family: transient contention worth retrying.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ResultCode::Busy
                | ResultCode::Locked
                | ResultCode::BusySnapshot
                | ResultCode::LockedSharedCache
        )
    }

    /// Success, has-row or finished. These never raise.
    pub fn is_success(self) -> bool {
        matches!(self, ResultCode::Ok | ResultCode::Row | ResultCode::Done)
    }
}

/// Raw-integer form of [`ResultCode::is_busy`] for the hot path.
#[inline]
pub fn is_busy_code(code: i32) -> bool {
    matches!(
        code,
        SQLITE_BUSY | SQLITE_LOCKED | SQLITE_BUSY_SNAPSHOT | SQLITE_LOCKED_SHAREDCACHE
    )
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Other(code) => write!(f, "error({code})"),
            named => write!(f, "{named:?}"),
        }
    }
}

/// Storage class of a column value in the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

impl ColumnType {
    /// Map the native storage-class tag (1..=5).
    pub fn from_raw(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(ColumnType::Integer),
            2 => Some(ColumnType::Float),
            3 => Some(ColumnType::Text),
            4 => Some(ColumnType::Blob),
            5 => Some(ColumnType::Null),
            _ => None,
        }
    }
}
