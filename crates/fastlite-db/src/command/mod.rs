//! Command/reader facade: multi-statement text, named parameters and a
//! forward-only reader, built on the same native primitives as the fast path.
//!
//! Every native failure raises here. Busy/locked retries use the 150 ms
//! interval with one wall-clock budget per execution, shared between
//! compiling and stepping.
//!
//! Known limitation: the `*_cancellable` variants check their token once
//! before any work starts. A retry loop that is already sleeping only ends at
//! its deadline.

mod parameters;
mod reader;
mod value;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use fastlite_core::{Error, Result};
use tokio_util::sync::CancellationToken;

use crate::connection::Connection;
use crate::native::StatementHandle;
use crate::prepare;
use crate::retry::RetryPolicy;
use crate::status::{self, Status};

pub use parameters::{Parameter, Parameters};
pub use reader::DataReader;
pub use value::Value;

/// SQL text plus parameters, executed against a borrowed connection.
///
/// Compiled statements are cached after the first execution (or an explicit
/// [`prepare`](Self::prepare)) and reused until the text changes.
pub struct Command<'c> {
    connection: &'c Connection,
    text: String,
    parameters: Parameters,
    timeout: Duration,
    prepared: Vec<StatementHandle>,
}

/// Statements queued for the reader (index, pending row) and the summed
/// change count, `None` when nothing changed data.
type Execution = (VecDeque<(usize, bool)>, Option<i64>);

/// What executing one statement left behind.
enum Executed {
    /// Row-producing or read-only; handed to the reader.
    Queued { has_row: bool },
    /// Ran to completion and changed this many rows.
    Changed(i64),
}

impl<'c> Command<'c> {
    pub fn new(connection: &'c Connection, text: impl Into<String>) -> Self {
        Self {
            connection,
            text: text.into(),
            parameters: Parameters::new(),
            timeout: RetryPolicy::DEFAULT_TIMEOUT,
            prepared: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the SQL text, discarding any compiled statements.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.prepared.clear();
        self.text = text.into();
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Busy/locked deadline for one execution.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn connection(&self) -> &'c Connection {
        self.connection
    }

    /// Compile every statement now. A no-op when already compiled.
    pub fn prepare(&mut self) -> Result<()> {
        self.check_ready()?;
        if !self.prepared.is_empty() {
            return Ok(());
        }
        self.prepared = prepare::all_statements(
            self.connection.handle(),
            &self.text,
            false,
            &self.policy(),
        )?;
        tracing::trace!("Prepared {} statements", self.prepared.len());
        Ok(())
    }

    /// Execute every statement and return a reader over the row-producing
    /// ones.
    ///
    /// Statements that change data are stepped to completion here and their
    /// change counts summed into [`DataReader::records_affected`].
    pub fn execute_reader(&mut self) -> Result<DataReader<'_>> {
        self.check_ready()?;
        let started = Instant::now();
        let unprepared = self.prepared.is_empty();

        let outcome = if unprepared {
            self.execute_unprepared(started)
        } else {
            self.execute_prepared(started)
        };

        match outcome {
            Ok((queue, changes)) => Ok(DataReader::new(
                &self.prepared,
                self.connection,
                queue,
                changes,
                self.policy(),
            )),
            Err(e) => {
                if unprepared {
                    self.prepared.clear();
                } else {
                    for statement in &self.prepared {
                        statement.reset();
                    }
                }
                Err(e)
            }
        }
    }

    /// Execute and return the number of rows changed, or -1 when no
    /// statement changed data.
    pub fn execute_non_query(&mut self) -> Result<i64> {
        let reader = self.execute_reader()?;
        Ok(reader.records_affected())
    }

    /// First column of the first row of the first result, if any.
    pub fn execute_scalar(&mut self) -> Result<Option<Value>> {
        let mut reader = self.execute_reader()?;
        if reader.read()? {
            Ok(Some(reader.get_value(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn execute_reader_cancellable(
        &mut self,
        token: &CancellationToken,
    ) -> Result<DataReader<'_>> {
        check_cancelled(token)?;
        self.execute_reader()
    }

    pub fn execute_non_query_cancellable(&mut self, token: &CancellationToken) -> Result<i64> {
        check_cancelled(token)?;
        self.execute_non_query()
    }

    pub fn execute_scalar_cancellable(
        &mut self,
        token: &CancellationToken,
    ) -> Result<Option<Value>> {
        check_cancelled(token)?;
        self.execute_scalar()
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy::prepare(self.timeout)
    }

    fn check_ready(&self) -> Result<()> {
        if !self.connection.is_open() {
            return Err(Error::ConnectionClosed);
        }
        if self.text.trim().is_empty() {
            return Err(Error::invalid_operation("command text is not set"));
        }
        Ok(())
    }

    /// Compile and execute one statement at a time so later statements see
    /// schema changes made by earlier ones.
    fn execute_unprepared(&mut self, started: Instant) -> Result<Execution> {
        let policy = self.policy();
        let mut queue = VecDeque::new();
        let mut changes = None;
        let mut rest = self.text.as_str();

        while !rest.trim().is_empty() {
            let (statement, tail) =
                prepare::next_statement(self.connection.handle(), rest, false, &policy, started)?;
            if let Some(statement) = statement {
                let executed = execute_statement(
                    self.connection,
                    &self.parameters,
                    &statement,
                    &policy,
                    started,
                );
                self.prepared.push(statement);
                record(&mut queue, &mut changes, self.prepared.len() - 1, executed?);
            }
            if tail.len() >= rest.len() {
                break;
            }
            rest = tail;
        }
        Ok((queue, changes))
    }

    fn execute_prepared(&self, started: Instant) -> Result<Execution> {
        let policy = self.policy();
        let mut queue = VecDeque::new();
        let mut changes = None;
        for (index, statement) in self.prepared.iter().enumerate() {
            let executed =
                execute_statement(self.connection, &self.parameters, statement, &policy, started)?;
            record(&mut queue, &mut changes, index, executed);
        }
        Ok((queue, changes))
    }
}

impl std::fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("text", &self.text)
            .field("parameters", &self.parameters.len())
            .field("prepared", &self.prepared.len())
            .finish()
    }
}

fn check_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn record(
    queue: &mut VecDeque<(usize, bool)>,
    changes: &mut Option<i64>,
    index: usize,
    executed: Executed,
) {
    match executed {
        Executed::Queued { has_row } => queue.push_back((index, has_row)),
        Executed::Changed(count) => *changes = Some(changes.unwrap_or(0) + count),
    }
}

fn execute_statement(
    connection: &Connection,
    parameters: &Parameters,
    statement: &StatementHandle,
    policy: &RetryPolicy,
    started: Instant,
) -> Result<Executed> {
    let handle = connection.handle();

    let bound = parameters.bind(statement, handle)?;
    let expected = usize::try_from(statement.parameter_count()).unwrap_or(0);
    if bound != expected {
        return Err(Error::MissingParameters(parameters.unbound(statement)));
    }

    let code = policy.run_between(
        started,
        || statement.step(),
        || {
            statement.reset();
        },
    );
    let status = status::classify(code, Some(handle))?;

    // Read-only is a heuristic for SELECT-like statements; a statement that
    // returned a row is always handed to the reader.
    if status == Status::Row || statement.is_readonly() {
        return Ok(Executed::Queued {
            has_row: status != Status::Done,
        });
    }
    statement.reset();
    Ok(Executed::Changed(handle.changes()))
}
