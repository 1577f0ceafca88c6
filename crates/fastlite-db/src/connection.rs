//! An open database session plus the settings it was opened with.

use std::time::{Duration, Instant};

use fastlite_core::{ConnectionOptions, Error, Result};

use crate::command::Command;
use crate::native::{ConnectionHandle, StatementHandle};
use crate::prepare;
use crate::query::QueryReader;
use crate::retry::RetryPolicy;
use crate::status::{self, Status};

/// One native session, owned by exactly one caller at a time.
///
/// Moves freely between threads but is never shared: the engine's
/// per-session state (last error, change count, last rowid) belongs to
/// whoever last stepped a statement on it.
#[derive(Debug)]
pub struct Connection {
    handle: ConnectionHandle,
    options: ConnectionOptions,
    step_timeout: Duration,
    prepare_timeout: Duration,
}

impl Connection {
    pub fn open(options: &ConnectionOptions) -> Result<Self> {
        let handle = ConnectionHandle::open(options)?;
        Ok(Self {
            handle,
            options: options.clone(),
            step_timeout: RetryPolicy::DEFAULT_TIMEOUT,
            prepare_timeout: RetryPolicy::DEFAULT_TIMEOUT,
        })
    }

    /// Open from a `key=value;...` connection string.
    pub fn open_str(connection_string: &str) -> Result<Self> {
        Self::open(&ConnectionOptions::parse(connection_string)?)
    }

    /// Override the busy/locked deadlines used for statements on this
    /// connection.
    pub fn with_timeouts(mut self, step: Duration, prepare: Duration) -> Self {
        self.step_timeout = step;
        self.prepare_timeout = prepare;
        self
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Opaque identity of the native session.
    pub fn token(&self) -> usize {
        self.handle.token()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_valid()
    }

    /// Idempotent.
    pub fn close(&mut self) {
        self.handle.close();
    }

    pub fn step_policy(&self) -> RetryPolicy {
        RetryPolicy::step(self.step_timeout)
    }

    pub fn prepare_policy(&self) -> RetryPolicy {
        RetryPolicy::prepare(self.prepare_timeout)
    }

    pub fn changes(&self) -> i64 {
        self.handle.changes()
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.handle.last_insert_rowid()
    }

    /// Statements prepared on this connection and not yet finalized.
    pub fn live_statement_count(&self) -> usize {
        self.handle.live_statement_count()
    }

    /// Run every statement in `sql` to completion, discarding rows.
    ///
    /// Statements are compiled one at a time, so later statements may depend
    /// on schema created by earlier ones.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let prepare_policy = self.prepare_policy();
        let step_policy = self.step_policy();
        let mut rest = sql;

        while !rest.trim().is_empty() {
            let (statement, tail) =
                prepare::next_statement(&self.handle, rest, false, &prepare_policy, Instant::now())?;
            if let Some(statement) = statement {
                self.run_to_completion(&statement, &step_policy)?;
            }
            if tail.len() >= rest.len() {
                break;
            }
            rest = tail;
        }
        Ok(())
    }

    /// Run a single-statement query and map its first row, if any.
    pub fn query_row<T, F>(&self, sql: &str, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&QueryReader<'_>) -> T,
    {
        let mut statements =
            prepare::all_statements(&self.handle, sql, false, &self.prepare_policy())?;
        if statements.len() != 1 {
            return Err(Error::StatementCount {
                found: statements.len(),
            });
        }
        let statement = statements.remove(0);

        let code = self.step_policy().run(|| statement.step());
        match status::classify(code, Some(&self.handle))? {
            Status::Row => Ok(Some(f(&QueryReader::new(&statement, &self.handle)))),
            Status::Ok | Status::Done => Ok(None),
        }
    }

    /// First column of the first row as text.
    pub fn query_scalar_text(&self, sql: &str) -> Result<Option<String>> {
        Ok(self
            .query_row(sql, |row| row.column_str(0).map(str::to_owned))?
            .flatten())
    }

    /// First column of the first row as an integer.
    pub fn query_scalar_i64(&self, sql: &str) -> Result<Option<i64>> {
        self.query_row(sql, |row| row.column_int64(0))
    }

    /// A facade command over this connection.
    pub fn create_command(&self, text: impl Into<String>) -> Command<'_> {
        Command::new(self, text)
    }

    fn run_to_completion(&self, statement: &StatementHandle, policy: &RetryPolicy) -> Result<()> {
        loop {
            let code = policy.run(|| statement.step());
            if status::classify(code, Some(&self.handle))? != Status::Row {
                return Ok(());
            }
        }
    }
}
