//! fastlite-core: shared types for the fastlite workspace.
//!
//! This crate carries everything that does not need the native engine linked:
//!
//! - **Errors**: the unified [`Error`] type and [`Result`] alias
//! - **Codes**: the closed [`ResultCode`] enumeration and [`ColumnType`]
//! - **Options**: [`ConnectionOptions`] and connection-string parsing
//! - **Config**: [`PoolConfig`] and the [`PragmaProfile`] applied to pooled
//!   connections

pub mod codes;
pub mod config;
pub mod error;
pub mod options;

pub use codes::{ColumnType, ResultCode};
pub use config::{JournalMode, PoolConfig, PragmaProfile, Synchronous};
pub use error::{Error, ErrorCategory, Result};
pub use options::{CacheMode, ConnectionOptions, OpenMode};
