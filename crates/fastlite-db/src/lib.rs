//! fastlite-db: the parts of fastlite that link the native SQLite engine.
//!
//! - **native**: owned connection and statement handles with exactly-once
//!   release
//! - **status**: translation of native result codes into [`Status`] or an
//!   error
//! - **retry**: the fixed-interval busy/locked [`RetryPolicy`]
//! - **query**: [`FastQuery`], one statement driven through raw bind/step/read
//! - **pool**: [`ConnectionPool`], a bounded set of initialized connections
//! - **command**: the [`Command`]/[`DataReader`] facade over multi-statement
//!   text
//!
//! ```
//! use std::sync::Arc;
//! use fastlite_db::{ConnectionOptions, ConnectionPool};
//!
//! let pool = Arc::new(ConnectionPool::new(ConnectionOptions::memory()).unwrap());
//! let mut query = pool.fast_query("SELECT ?1 * 2").unwrap();
//! query.binder().bind_int64(1, 21);
//! let doubled = query.step(|_, row, _| row.column_int64(0), ()).unwrap();
//! assert_eq!(doubled, 42);
//! ```

pub mod command;
pub mod connection;
pub mod native;
pub mod pool;
pub mod prepare;
pub mod query;
pub mod retry;
pub mod status;

pub use command::{Command, DataReader, Parameters, Value};
pub use connection::Connection;
pub use pool::{ConnectionInit, ConnectionPool, PoolBuilder};
pub use query::{BindAction, FastQuery, QueryBinder, QueryReader, StepReader};
pub use retry::RetryPolicy;
pub use status::Status;

pub use fastlite_core::{
    CacheMode, ColumnType, ConnectionOptions, Error, ErrorCategory, OpenMode, PoolConfig,
    PragmaProfile, Result, ResultCode,
};
