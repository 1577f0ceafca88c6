//! fastlite - SQLite data access with pooled connections and a
//! zero-allocation prepared statement fast path.
//!
//! This crate re-exports the workspace libraries for applications and
//! integration tests, and hosts the `fastlite` command-line tool.

pub mod report;

pub use fastlite_core as core;
pub use fastlite_db as db;

pub use fastlite_db::{
    BindAction, CacheMode, ColumnType, Command, Connection, ConnectionOptions, ConnectionPool,
    DataReader, Error, ErrorCategory, FastQuery, OpenMode, Parameters, PoolBuilder, PoolConfig,
    PragmaProfile, QueryBinder, QueryReader, Result, ResultCode, RetryPolicy, StepReader, Value,
};
