//! Shared test harness for integration tests.
//!
//! Provides [`TestDb`], a temporary directory holding one database file, plus
//! helpers to open connections and pools against it.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fastlite::{Connection, ConnectionOptions, ConnectionPool, PoolBuilder};
use tempfile::TempDir;

/// A database file in a temporary directory, removed on drop.
pub struct TestDb {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("test.db");
        Self { dir, path }
    }

    pub fn options(&self) -> ConnectionOptions {
        ConnectionOptions::new(self.path.to_string_lossy())
    }

    pub fn connection_string(&self) -> String {
        self.options().to_string()
    }

    /// A plain connection with the given busy/locked deadline.
    pub fn connect(&self, timeout: Duration) -> Connection {
        Connection::open(&self.options())
            .expect("failed to open connection")
            .with_timeouts(timeout, timeout)
    }

    pub fn pool_builder(&self) -> PoolBuilder {
        ConnectionPool::builder(self.options())
    }

    pub fn pool(&self) -> Arc<ConnectionPool> {
        Arc::new(self.pool_builder().build().expect("failed to build pool"))
    }

    /// Create a simple key/value table.
    pub fn with_table(self) -> Self {
        self.connect(Duration::from_secs(5))
            .execute_batch("CREATE TABLE kv (k INTEGER PRIMARY KEY, v)")
            .expect("failed to create table");
        self
    }
}
