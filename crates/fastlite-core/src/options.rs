//! Connection options and connection-string parsing.
//!
//! A connection string is a `;`-delimited list of `key=value` pairs:
//!
//! ```
//! use fastlite_core::options::{CacheMode, ConnectionOptions, OpenMode};
//!
//! let options = ConnectionOptions::parse("Data Source=app.db;Mode=ReadOnly;Cache=Shared").unwrap();
//! assert_eq!(options.data_source, "app.db");
//! assert_eq!(options.mode, OpenMode::ReadOnly);
//! assert_eq!(options.cache, CacheMode::Shared);
//! assert_eq!(options.to_string(), "Data Source=app.db;Mode=ReadOnly;Cache=Shared");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Data source naming a private, per-connection in-memory database.
pub const MEMORY_DATA_SOURCE: &str = ":memory:";

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    /// Open for reading and writing, creating the file if needed.
    #[default]
    ReadWriteCreate,
    /// Open for reading and writing; the file must exist.
    ReadWrite,
    /// Open read-only.
    ReadOnly,
    /// Open an in-memory database named by the data source.
    Memory,
}

/// Page-cache sharing between connections in the same process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    /// Leave the engine default in place.
    #[default]
    Default,
    Private,
    Shared,
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "readwritecreate" => Ok(OpenMode::ReadWriteCreate),
            "readwrite" => Ok(OpenMode::ReadWrite),
            "readonly" => Ok(OpenMode::ReadOnly),
            "memory" => Ok(OpenMode::Memory),
            _ => Err(Error::connection_string(format!(
                "'{s}' is not a valid value for Mode"
            ))),
        }
    }
}

impl FromStr for CacheMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(CacheMode::Default),
            "private" => Ok(CacheMode::Private),
            "shared" => Ok(CacheMode::Shared),
            _ => Err(Error::connection_string(format!(
                "'{s}' is not a valid value for Cache"
            ))),
        }
    }
}

/// Everything needed to open one native connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// File path, [`MEMORY_DATA_SOURCE`], or the name of an in-memory database
    /// when [`OpenMode::Memory`] is used.
    pub data_source: String,
    pub mode: OpenMode,
    pub cache: CacheMode,
}

impl ConnectionOptions {
    /// Options for a file database with default mode and cache.
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            ..Self::default()
        }
    }

    /// Options for a private in-memory database.
    pub fn memory() -> Self {
        Self::new(MEMORY_DATA_SOURCE)
    }

    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    /// Parse a `key=value;key=value` connection string.
    ///
    /// Keys are case-insensitive. `Data Source`, `DataSource` and `Filename`
    /// are aliases; when several appear the last one wins. Unknown keys are
    /// rejected.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let mut options = Self::default();

        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, value) = segment.split_once('=').ok_or_else(|| {
                Error::connection_string(format!("'{segment}' is not a key=value pair"))
            })?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "data source" | "datasource" | "filename" => {
                    options.data_source = value.to_string();
                }
                "mode" => options.mode = value.parse()?,
                "cache" => options.cache = value.parse()?,
                other => {
                    return Err(Error::connection_string(format!(
                        "Keyword not supported: '{other}'"
                    )));
                }
            }
        }

        Ok(options)
    }

    /// Whether this names an in-memory database of any kind.
    pub fn is_memory(&self) -> bool {
        self.mode == OpenMode::Memory || self.data_source == MEMORY_DATA_SOURCE
    }
}

impl FromStr for ConnectionOptions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if !self.data_source.is_empty() {
            parts.push(format!("Data Source={}", self.data_source));
        }
        if self.mode != OpenMode::default() {
            parts.push(format!("Mode={:?}", self.mode));
        }
        if self.cache != CacheMode::default() {
            parts.push(format!("Cache={:?}", self.cache));
        }
        f.write_str(&parts.join(";"))
    }
}
