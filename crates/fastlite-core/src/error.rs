//! Unified error type for fastlite.
//!
//! Every failure in the workspace funnels into [`Error`]. Native engine
//! failures keep the original integer result code so callers can match on
//! it programmatically via [`Error::code`] or [`Error::native_code`].

use crate::codes::ResultCode;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Busy/locked contention that outlived its retry deadline.
    Contention,
    /// Any other native engine failure (bad SQL, constraint, I/O, corruption).
    Native,
    /// Local misuse detected without consulting the engine.
    Misuse,
}

/// Unified error type covering all failure modes in fastlite.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The native engine returned a non-success result code.
    #[error("SQLite Error {code}: '{message}'")]
    Sqlite {
        /// The raw native result code.
        code: i32,
        /// Message reported by the engine for this code.
        message: String,
    },

    /// A fast query was built from SQL that did not compile to exactly one
    /// statement.
    #[error("Fast query supports only a single statement, found {found}")]
    StatementCount {
        /// Number of statements the SQL compiled to.
        found: usize,
    },

    /// The connection pool has been disposed.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The connection handle has already been closed.
    #[error("Connection is closed")]
    ConnectionClosed,

    /// One or more parameter slots of a command were left unbound.
    #[error("Must add values for the following parameters: {0}")]
    MissingParameters(String),

    /// Any other misuse of the API.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A connection string could not be parsed.
    #[error("Invalid connection string: {0}")]
    ConnectionString(String),

    /// A configuration document could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// The caller cancelled the operation before it started.
    #[error("Operation was cancelled")]
    Cancelled,

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for [`Error::Sqlite`].
    pub fn sqlite(code: i32, message: impl Into<String>) -> Self {
        Error::Sqlite {
            code,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::InvalidOperation`].
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }

    /// Convenience constructor for [`Error::ConnectionString`].
    pub fn connection_string(message: impl Into<String>) -> Self {
        Error::ConnectionString(message.into())
    }

    /// The result code carried by a native error, if any.
    pub fn code(&self) -> Option<ResultCode> {
        self.native_code().map(ResultCode::from_raw)
    }

    /// The raw integer carried by a native error, if any.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Error::Sqlite { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this is busy/locked contention that was not resolved in time.
    pub fn is_busy(&self) -> bool {
        self.code().is_some_and(|code| code.is_busy())
    }

    /// Classify this error for retry and reporting decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Sqlite { .. } if self.is_busy() => ErrorCategory::Contention,
            Error::Sqlite { .. } | Error::Io { .. } => ErrorCategory::Native,
            _ => ErrorCategory::Misuse,
        }
    }
}

/// Result type alias using the fastlite [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
