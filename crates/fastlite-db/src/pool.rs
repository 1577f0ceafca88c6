//! Bounded pool of initialized connections.

use std::sync::Arc;
use std::time::Duration;

use fastlite_core::{ConnectionOptions, Error, PoolConfig, PragmaProfile, Result};
use parking_lot::Mutex;

use crate::connection::Connection;
use crate::query::FastQuery;

/// Runs once on every freshly opened connection before it is handed out.
pub type ConnectionInit = dyn Fn(&Connection) -> Result<()> + Send + Sync;

struct PoolState {
    idle: Vec<Connection>,
    closed: bool,
}

/// Thread-safe pool of native connections to one data source.
///
/// A connection is either idle in the pool or owned by exactly one caller.
/// The pool never blocks: [`rent`](Self::rent) opens a new connection when no
/// idle one is available, and [`release`](Self::release) closes connections
/// that would push the idle set over capacity. Callers are trusted to
/// release each rented connection at most once.
pub struct ConnectionPool {
    options: ConnectionOptions,
    config: PoolConfig,
    init: Box<ConnectionInit>,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    /// A pool with default configuration.
    pub fn new(options: ConnectionOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    /// A pool over a `key=value;...` connection string.
    pub fn open(connection_string: &str) -> Result<Self> {
        Self::new(ConnectionOptions::parse(connection_string)?)
    }

    pub fn with_config(options: ConnectionOptions, config: PoolConfig) -> Result<Self> {
        Self::builder(options).config(config).build()
    }

    pub fn builder(options: ConnectionOptions) -> PoolBuilder {
        PoolBuilder {
            options,
            config: PoolConfig::default(),
            init: None,
        }
    }

    /// Take an idle connection, or open and initialize a new one.
    pub fn rent(&self) -> Result<Connection> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::PoolClosed);
            }
            if let Some(connection) = state.idle.pop() {
                tracing::trace!("Rented idle connection ({} left idle)", state.idle.len());
                return Ok(connection);
            }
        }

        let connection = self.open_connection()?;

        // Disposed while the connection was being opened.
        if self.state.lock().closed {
            return Err(Error::PoolClosed);
        }
        tracing::trace!("Rented new connection");
        Ok(connection)
    }

    /// Return a rented connection.
    ///
    /// Kept for reuse while the idle set is below capacity, closed otherwise.
    /// On a disposed pool the connection is closed and
    /// [`Error::PoolClosed`] is returned.
    pub fn release(&self, mut connection: Connection) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            connection.close();
            return Err(Error::PoolClosed);
        }
        if connection.is_open() && state.idle.len() < self.config.capacity {
            state.idle.push(connection);
            tracing::trace!("Released connection ({} idle)", state.idle.len());
            return Ok(());
        }
        drop(state);
        connection.close();
        tracing::trace!("Closed released connection over capacity");
        Ok(())
    }

    /// Close every idle connection and refuse further use. Idempotent.
    ///
    /// Rented connections are not tracked; releasing one later closes it.
    pub fn dispose(&self) {
        let idle = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.idle)
        };
        let count = idle.len();
        drop(idle);
        tracing::debug!("Connection pool disposed; closed {count} idle connections");
    }

    /// A fast query on a rented connection that goes back to this pool when
    /// the query is dropped.
    pub fn fast_query(self: &Arc<Self>, sql: impl Into<String>) -> Result<FastQuery> {
        let connection = self.rent()?;
        FastQuery::with_pool(sql, connection, Arc::clone(self))
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn open_connection(&self) -> Result<Connection> {
        let connection = Connection::open(&self.options)?
            .with_timeouts(self.config.step_timeout(), self.config.prepare_timeout());
        (self.init)(&connection)?;
        tracing::debug!("Initialized pooled connection to '{}'", self.options.data_source);
        Ok(connection)
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConnectionPool")
            .field("options", &self.options)
            .field("capacity", &self.config.capacity)
            .field("idle", &state.idle.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Builder for [`ConnectionPool`].
pub struct PoolBuilder {
    options: ConnectionOptions,
    config: PoolConfig,
    init: Option<Box<ConnectionInit>>,
}

impl PoolBuilder {
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Open one connection while building so a bad data source fails early.
    pub fn warm(mut self, warm: bool) -> Self {
        self.config.warm = warm;
        self
    }

    pub fn pragmas(mut self, pragmas: PragmaProfile) -> Self {
        self.config.pragmas = pragmas;
        self
    }

    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.config.step_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn prepare_timeout(mut self, timeout: Duration) -> Self {
        self.config.prepare_timeout_ms = duration_ms(timeout);
        self
    }

    /// Replace the pragma profile with a custom initializer. It runs once per
    /// physical connection.
    pub fn init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Connection) -> Result<()> + Send + Sync + 'static,
    {
        self.init = Some(Box::new(init));
        self
    }

    pub fn build(self) -> Result<ConnectionPool> {
        for warning in self.config.validate() {
            tracing::warn!("Pool config: {warning}");
        }

        let init = self.init.unwrap_or_else(|| pragma_init(&self.config.pragmas));
        let pool = ConnectionPool {
            options: self.options,
            config: self.config,
            init,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                closed: false,
            }),
        };

        if pool.config.warm {
            let connection = pool.rent()?;
            pool.release(connection)?;
            tracing::debug!("Connection pool warmed for '{}'", pool.options.data_source);
        }
        Ok(pool)
    }
}

/// Default initializer: apply the pragma profile as one batch.
fn pragma_init(pragmas: &PragmaProfile) -> Box<ConnectionInit> {
    let sql = pragmas.to_sql();
    Box::new(move |connection: &Connection| connection.execute_batch(&sql))
}

fn duration_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
